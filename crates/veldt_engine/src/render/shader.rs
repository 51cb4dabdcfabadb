//! Shader variants, feature bitsets and the variant registry
//!
//! Materials are described symbolically ("normalmap", "glitter", "--") and
//! resolved against a catalog of shader descriptions keyed by feature
//! bitset. The registry hands out dense shader indices on demand, then
//! compiles exactly the set of variants a loaded scene needs: one compiled
//! program per distinct bitset, one catalog entry per program name.

use std::collections::{BTreeMap, HashMap};

use bitflags::bitflags;
use log::{error, info, warn};
use slotmap::{new_key_type, SlotMap};

use crate::render::device::{GraphicsDevice, ProgramId, UniformLocation};
use crate::render::{RenderError, RenderResult};

bitflags! {
    /// Material feature bitset a shader variant is compiled for
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct ShaderFeatures: u64 {
        /// Directional light model
        const DIRECTIONAL_LIGHT = 0x1;
        /// Point light model
        const POINT_LIGHT = 0x2;
        // 0x4 reserved for a spot light model
        /// Writes geometry attributes to multiple render targets
        const DEFERRED_GEOMETRY = 0x8;
        /// Samples geometry attributes during light accumulation
        const DEFERRED_LIGHT = 0x10;
        /// Screen-space 2D drawing
        const TWO_D = 0x20;
        /// Sky dome
        const SKY = 0x40;
        /// Specular highlight term
        const SPECULAR = 0x80;
        /// Tangent-space normal mapping
        const NORMAL_MAP = 0x100;
        /// GPU instancing with per-instance offset/rotation buffers
        const INSTANCING = 0x200;
        /// Distance fog
        const FOG = 0x400;
        /// Time-animated small waves
        const SMALL_WAVES = 0x1000;
        /// View-dependent glitter
        const GLITTER = 0x2000;
    }
}

bitflags! {
    /// Full-screen post-processing effect bitset
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct PostEffects: u64 {
        /// Luminance-only output
        const GRAYSCALE = 0x1;
        /// Darkened screen borders
        const VIGNETTE = 0x2;
        /// Refracting water drops
        const DROPS_ON_LENS = 0x4;
        /// Relief edge highlighting
        const EMBOSS = 0x8;
    }
}

/// Translate a symbolic material property name into its feature flag.
/// `"--"` is the basic textured material with no extra features.
pub fn feature_flag_for(property: &str) -> Option<ShaderFeatures> {
    match property {
        "directional" => Some(ShaderFeatures::DIRECTIONAL_LIGHT),
        "point" => Some(ShaderFeatures::POINT_LIGHT),
        "deferred-geometry" => Some(ShaderFeatures::DEFERRED_GEOMETRY),
        "deferred-light" => Some(ShaderFeatures::DEFERRED_LIGHT),
        "2d" => Some(ShaderFeatures::TWO_D),
        "sky" => Some(ShaderFeatures::SKY),
        "specular" => Some(ShaderFeatures::SPECULAR),
        "normalmap" => Some(ShaderFeatures::NORMAL_MAP),
        "instancing" => Some(ShaderFeatures::INSTANCING),
        "fog" => Some(ShaderFeatures::FOG),
        "small-waves" => Some(ShaderFeatures::SMALL_WAVES),
        "glitter" => Some(ShaderFeatures::GLITTER),
        "--" => Some(ShaderFeatures::empty()),
        _ => None,
    }
}

/// Translate a post-processing effect name into its flag
pub fn post_effect_flag_for(effect: &str) -> Option<PostEffects> {
    match effect {
        "grayscale" => Some(PostEffects::GRAYSCALE),
        "vignette" => Some(PostEffects::VIGNETTE),
        "drops-on-lens" => Some(PostEffects::DROPS_ON_LENS),
        "emboss" => Some(PostEffects::EMBOSS),
        _ => None,
    }
}

/// Parse a whitespace-separated feature list into the two bitsets
pub fn parse_feature_list(features: &str) -> (ShaderFeatures, PostEffects) {
    let mut flags = ShaderFeatures::empty();
    let mut post = PostEffects::empty();

    for token in features.split_whitespace() {
        if let Some(flag) = feature_flag_for(token) {
            flags |= flag;
        } else if let Some(effect) = token
            .strip_prefix("postprocessing:")
            .and_then(post_effect_flag_for)
        {
            post |= effect;
        }
    }

    (flags, post)
}

/// Resolved uniform locations of one compiled variant.
///
/// A field is `None` when the program does not declare the uniform; uploads
/// through the `_opt` device helpers are skipped for those.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformTable {
    /// Colour texture unit
    pub colour_texture: Option<UniformLocation>,

    /// Model matrix
    pub model: Option<UniformLocation>,
    /// View matrix
    pub view: Option<UniformLocation>,
    /// Projection matrix
    pub projection: Option<UniformLocation>,

    /// Light direction, directional variants only
    pub light_direction: Option<UniformLocation>,
    /// Per-instance rotation matrix, directional variants only
    pub rotation: Option<UniformLocation>,
    /// Diffuse light colour
    pub diffuse_light_colour: Option<UniformLocation>,
    /// Ambient light colour
    pub ambient_light_colour: Option<UniformLocation>,

    /// World-space light position, point variants only
    pub light_position: Option<UniformLocation>,

    /// Normal map texture unit
    pub normal_texture: Option<UniformLocation>,
    /// Elapsed time, wave variants only
    pub time: Option<UniformLocation>,
    /// Camera position, glitter variants only
    pub camera_position: Option<UniformLocation>,
    /// Glitter material alpha
    pub material_alpha: Option<UniformLocation>,
    /// Fog density
    pub fog_density: Option<UniformLocation>,
    /// Fog colour
    pub fog_colour: Option<UniformLocation>,

    /// Position component sampler, deferred light passes
    pub position_component: Option<UniformLocation>,
    /// Normal component sampler, deferred light passes
    pub normal_component: Option<UniformLocation>,
    /// Diffuse component sampler, deferred light passes
    pub diffuse_component: Option<UniformLocation>,
    /// Screen size, point light pass
    pub screen_size: Option<UniformLocation>,
    /// Light power and volume radius, point light pass
    pub light_parameters: Option<UniformLocation>,

    /// Screen aspect ratio, post-processing
    pub screen_ratio: Option<UniformLocation>,
}

/// One compiled shader variant: program handle, resolved uniforms and the
/// light-model tag the broadcast setters filter on
#[derive(Debug, Clone, Default)]
pub struct ShaderVariant {
    /// Compiled program handle
    pub program: ProgramId,
    /// Resolved uniform locations
    pub uniforms: UniformTable,
    /// True when the variant consumes the directional light uniforms
    pub is_directional_light: bool,
}

/// Catalog description of one shader: where its sources live and which
/// feature bitset it implements
#[derive(Debug, Clone, Default)]
pub struct ShaderDescription {
    /// Vertex shader source path
    pub vertex_path: String,
    /// Fragment shader source path
    pub fragment_path: String,
    /// Feature bitset the shader implements
    pub features: ShaderFeatures,
    /// Post-processing effect bitset, for post shaders only
    pub post_effects: PostEffects,
}

/// Static name → description table for every shader the renderer can use
#[derive(Debug, Clone, Default)]
pub struct ShaderCatalog {
    entries: HashMap<String, ShaderDescription>,
}

impl ShaderCatalog {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shader under a name, feature list in the textual form
    /// accepted by [`parse_feature_list`]
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        vertex_path: impl Into<String>,
        fragment_path: impl Into<String>,
        features: &str,
    ) {
        let (flags, post) = parse_feature_list(features);
        self.entries.insert(
            name.into(),
            ShaderDescription {
                vertex_path: vertex_path.into(),
                fragment_path: fragment_path.into(),
                features: flags,
                post_effects: post,
            },
        );
    }

    /// Description for a shader name
    pub fn get(&self, name: &str) -> Option<&ShaderDescription> {
        self.entries.get(name)
    }

    /// Iterate over all registered shaders
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ShaderDescription)> {
        self.entries
            .iter()
            .map(|(name, description)| (name.as_str(), description))
    }

    /// First entry whose feature bitset matches exactly
    pub fn find_by_features(&self, features: ShaderFeatures) -> Option<(&str, &ShaderDescription)> {
        self.entries
            .iter()
            .find(|(_, description)| description.features == features)
            .map(|(name, description)| (name.as_str(), description))
    }

    /// First entry whose post-effect bitset matches exactly
    pub fn find_by_post_effects(&self, post: PostEffects) -> Option<(&str, &ShaderDescription)> {
        self.entries
            .iter()
            .find(|(_, description)| {
                !description.post_effects.is_empty() && description.post_effects == post
            })
            .map(|(name, description)| (name.as_str(), description))
    }

    /// The standard shader set this renderer ships with
    pub fn standard() -> Self {
        let mut catalog = Self::new();

        let entries: &[(&str, &str)] = &[
            ("directional-forward", "directional"),
            ("directional-fog", "directional fog"),
            ("directional-normalmap", "directional normalmap"),
            ("directional-fog-normalmap", "directional normalmap fog"),
            ("directional-waves", "directional small-waves"),
            ("directional-fog-waves", "directional small-waves fog"),
            ("directional-glitter", "directional glitter"),
            ("directional-fog-glitter", "directional glitter fog"),
            ("directional-instancing", "directional instancing"),
            ("directional-fog-instancing", "directional instancing fog"),
            ("point-forward", "point"),
            ("point-fog", "point fog"),
            ("point-normalmap", "point normalmap"),
            ("point-waves", "point small-waves"),
            ("point-glitter", "point glitter"),
            ("point-instancing", "point instancing"),
            ("deferred-geometry-directional", "directional deferred-geometry"),
            (
                "deferred-geometry-directional-normalmap",
                "directional deferred-geometry normalmap",
            ),
            (
                "deferred-geometry-directional-instancing",
                "directional deferred-geometry instancing",
            ),
            ("deferred-geometry-point", "point deferred-geometry"),
            (
                "deferred-geometry-point-normalmap",
                "point deferred-geometry normalmap",
            ),
            (
                "deferred-geometry-point-instancing",
                "point deferred-geometry instancing",
            ),
            ("directional-light-pass", "directional deferred-light"),
            ("directional-fog-light-pass", "directional deferred-light fog"),
            ("point-light-pass", "point deferred-light"),
            ("stencil", "--"),
            ("sky", "sky"),
            ("grayscale", "postprocessing:grayscale"),
            ("vignette", "postprocessing:vignette"),
            ("drops-on-lens", "postprocessing:drops-on-lens"),
            ("emboss", "postprocessing:emboss"),
        ];

        for &(name, features) in entries {
            catalog.insert(
                name,
                format!("shaders/{name}.vert"),
                format!("shaders/{name}.frag"),
                features,
            );
        }

        catalog
    }
}

/// Provider of shader source text; file access lives with the loaders
pub trait ShaderSourceProvider {
    /// Source text for a path, `None` when missing
    fn load_source(&mut self, path: &str) -> Option<String>;
}

new_key_type! {
    /// Key of a compiled variant inside the registry cache
    pub struct VariantKey;
}

/// Registry of compiled shader variants and the dense index table of
/// variants the loaded scene needs.
///
/// Index assignment is first-seen-wins and stays stable for the lifetime of
/// a loaded scene; indices are contiguous `0..N-1`. The compiled cache is
/// append-only and keyed by shader name.
pub struct ShaderVariantRegistry {
    catalog: ShaderCatalog,
    directional_light: bool,
    variants: SlotMap<VariantKey, ShaderVariant>,
    by_name: HashMap<String, VariantKey>,
    needed: BTreeMap<usize, ShaderFeatures>,
}

impl ShaderVariantRegistry {
    /// Registry over a shader catalog
    pub fn new(catalog: ShaderCatalog) -> Self {
        Self {
            catalog,
            directional_light: false,
            variants: SlotMap::with_key(),
            by_name: HashMap::new(),
            needed: BTreeMap::new(),
        }
    }

    /// Select the scene's light model, set once per scene before any
    /// index is requested
    pub fn set_light_model(&mut self, directional: bool) {
        self.directional_light = directional;
    }

    /// The shader catalog
    pub fn catalog(&self) -> &ShaderCatalog {
        &self.catalog
    }

    /// Compiled variant for a key
    pub fn variant(&self, key: VariantKey) -> &ShaderVariant {
        &self.variants[key]
    }

    /// Mutable compiled variant for a key
    pub fn variant_mut(&mut self, key: VariantKey) -> &mut ShaderVariant {
        &mut self.variants[key]
    }

    /// The dense index → feature bitset table populated so far
    pub fn needed_features(&self) -> &BTreeMap<usize, ShaderFeatures> {
        &self.needed
    }

    /// Return the cached variant for a shader name, compiling and linking
    /// it from catalog sources on first use.
    pub fn resolve_or_compile(
        &mut self,
        device: &mut dyn GraphicsDevice,
        sources: &mut dyn ShaderSourceProvider,
        name: &str,
    ) -> RenderResult<VariantKey> {
        if name.is_empty() {
            return Err(RenderError::ShaderResolution(
                "no shader name provided".to_string(),
            ));
        }

        if let Some(&key) = self.by_name.get(name) {
            return Ok(key);
        }

        info!("creating shader \"{name}\"");

        let description = self.catalog.get(name).ok_or_else(|| {
            RenderError::ShaderResolution(format!("shader \"{name}\" is not described"))
        })?;
        if description.vertex_path.is_empty() || description.fragment_path.is_empty() {
            return Err(RenderError::ShaderResolution(format!(
                "source paths aren't specified for shader \"{name}\""
            )));
        }

        let vertex_source = sources
            .load_source(&description.vertex_path)
            .filter(|source| !source.is_empty())
            .ok_or_else(|| {
                RenderError::ShaderResolution(format!(
                    "can't load shader source from {}",
                    description.vertex_path
                ))
            })?;
        let fragment_source = sources
            .load_source(&description.fragment_path)
            .filter(|source| !source.is_empty())
            .ok_or_else(|| {
                RenderError::ShaderResolution(format!(
                    "can't load shader source from {}",
                    description.fragment_path
                ))
            })?;

        let program = device.compile_program(&vertex_source, &fragment_source)?;

        let key = self.variants.insert(ShaderVariant {
            program,
            uniforms: UniformTable::default(),
            is_directional_light: false,
        });
        self.by_name.insert(name.to_string(), key);

        Ok(key)
    }

    /// Reserve (or look up) the dense shader index for a symbolic material
    /// property under the current light model.
    ///
    /// Never compiles anything. The deferred-geometry pass shades nothing,
    /// so fog is folded in only for the forward path.
    pub fn index_for_features(
        &mut self,
        property: &str,
        fog_enabled: bool,
        deferred_geometry: bool,
    ) -> RenderResult<usize> {
        let base = feature_flag_for(property)
            .ok_or_else(|| RenderError::UnknownShaderProperty(property.to_string()))?;

        let mut flags = base;
        flags |= if self.directional_light {
            ShaderFeatures::DIRECTIONAL_LIGHT
        } else {
            ShaderFeatures::POINT_LIGHT
        };
        if deferred_geometry {
            flags |= ShaderFeatures::DEFERRED_GEOMETRY;
        }
        if fog_enabled && !deferred_geometry {
            flags |= ShaderFeatures::FOG;
        }

        if let Some((&index, _)) = self.needed.iter().find(|(_, &f)| f == flags) {
            return Ok(index);
        }

        let index = self.needed.len();
        self.needed.insert(index, flags);
        Ok(index)
    }

    /// Compile every reserved index against the catalog and return the
    /// dense variant table, indexed identically to the needed table.
    ///
    /// A missing fog shader falls back to its fog-less description with a
    /// warning; a bitset with no description at all logs an error and
    /// leaves its slot unusable.
    pub fn realize_all(
        &mut self,
        device: &mut dyn GraphicsDevice,
        sources: &mut dyn ShaderSourceProvider,
    ) -> Vec<Option<VariantKey>> {
        let needed: Vec<(usize, ShaderFeatures)> =
            self.needed.iter().map(|(&i, &f)| (i, f)).collect();
        let mut realized = vec![None; needed.len()];

        for (index, flags) in needed {
            let mut found = self.catalog.find_by_features(flags);

            if found.is_none() && flags.contains(ShaderFeatures::FOG) {
                warn!("fog shader is not found for flags {flags:?}, trying fallback");
                found = self
                    .catalog
                    .find_by_features(flags.difference(ShaderFeatures::FOG));
            }

            let Some((name, _)) = found else {
                error!("can't find shader for flags {flags:?}");
                continue;
            };
            let name = name.to_string();

            match self.resolve_or_compile(device, sources, &name) {
                Ok(key) => realized[index] = Some(key),
                Err(err) => error!("cannot create shader \"{name}\": {err}"),
            }
        }

        realized
    }

    /// Resolve the compiled variant for a named post-processing effect
    pub fn post_effect_variant(
        &mut self,
        device: &mut dyn GraphicsDevice,
        sources: &mut dyn ShaderSourceProvider,
        effect: &str,
    ) -> RenderResult<VariantKey> {
        let flag = post_effect_flag_for(effect)
            .ok_or_else(|| RenderError::UnknownShaderProperty(effect.to_string()))?;

        let name = self
            .catalog
            .find_by_post_effects(flag)
            .map(|(name, _)| name.to_string())
            .ok_or_else(|| {
                RenderError::ShaderResolution(format!(
                    "can't find post-processing shader for {flag:?}"
                ))
            })?;

        self.resolve_or_compile(device, sources, &name)
    }

    /// Post-effect bitset for an effect name, empty when unknown
    pub fn post_effect_flags(&self, effect: &str) -> PostEffects {
        post_effect_flag_for(effect).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::test_support::{MemorySources, RecordingDevice};

    fn registry() -> ShaderVariantRegistry {
        let mut registry = ShaderVariantRegistry::new(ShaderCatalog::standard());
        registry.set_light_model(true);
        registry
    }

    #[test]
    fn test_index_assignment_is_deduplicated_and_contiguous() {
        let mut registry = registry();

        let plain = registry.index_for_features("--", false, false).unwrap();
        let normalmap = registry.index_for_features("normalmap", false, false).unwrap();
        let plain_again = registry.index_for_features("--", false, false).unwrap();

        assert_eq!(plain, 0);
        assert_eq!(normalmap, 1);
        assert_eq!(plain_again, plain);

        let indices: Vec<usize> = registry.needed_features().keys().copied().collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_fog_and_deferred_change_the_bitset() {
        let mut registry = registry();

        let plain = registry.index_for_features("--", false, false).unwrap();
        let foggy = registry.index_for_features("--", true, false).unwrap();
        // The deferred-geometry pass never folds fog in
        let deferred = registry.index_for_features("--", true, true).unwrap();

        assert_ne!(plain, foggy);
        assert_ne!(foggy, deferred);

        let deferred_flags = registry.needed_features()[&deferred];
        assert!(deferred_flags.contains(ShaderFeatures::DEFERRED_GEOMETRY));
        assert!(!deferred_flags.contains(ShaderFeatures::FOG));
    }

    #[test]
    fn test_point_light_model_selects_point_bit() {
        let mut registry = ShaderVariantRegistry::new(ShaderCatalog::standard());
        registry.set_light_model(false);

        let index = registry.index_for_features("--", false, false).unwrap();
        let flags = registry.needed_features()[&index];

        assert!(flags.contains(ShaderFeatures::POINT_LIGHT));
        assert!(!flags.contains(ShaderFeatures::DIRECTIONAL_LIGHT));
    }

    #[test]
    fn test_unknown_property_is_rejected() {
        let mut registry = registry();
        assert!(registry.index_for_features("holograms", false, false).is_err());
    }

    #[test]
    fn test_realize_all_fills_dense_table() {
        let mut registry = registry();
        let mut device = RecordingDevice::new();
        let mut sources = MemorySources::with_catalog_sources(registry.catalog());

        registry.index_for_features("--", false, false).unwrap();
        registry.index_for_features("normalmap", false, false).unwrap();

        let realized = registry.realize_all(&mut device, &mut sources);

        assert_eq!(realized.len(), 2);
        assert!(realized.iter().all(Option::is_some));
        assert_eq!(device.compile_count(), 2);
    }

    #[test]
    fn test_realized_variants_are_cached_by_name() {
        let mut registry = registry();
        let mut device = RecordingDevice::new();
        let mut sources = MemorySources::with_catalog_sources(registry.catalog());

        let first = registry
            .resolve_or_compile(&mut device, &mut sources, "sky")
            .unwrap();
        let second = registry
            .resolve_or_compile(&mut device, &mut sources, "sky")
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(device.compile_count(), 1);
    }

    #[test]
    fn test_fog_fallback_strips_the_fog_bit() {
        // A catalog that only describes the fog-less glitter shader
        let mut catalog = ShaderCatalog::new();
        catalog.insert(
            "directional-glitter",
            "shaders/directional-glitter.vert",
            "shaders/directional-glitter.frag",
            "directional glitter",
        );

        let mut registry = ShaderVariantRegistry::new(catalog);
        registry.set_light_model(true);
        let mut device = RecordingDevice::new();
        let mut sources = MemorySources::with_catalog_sources(registry.catalog());

        registry.index_for_features("glitter", true, false).unwrap();
        let realized = registry.realize_all(&mut device, &mut sources);

        assert_eq!(realized.len(), 1);
        assert!(realized[0].is_some());
    }

    #[test]
    fn test_unresolvable_bitset_leaves_slot_unusable() {
        let mut registry = ShaderVariantRegistry::new(ShaderCatalog::new());
        registry.set_light_model(true);
        let mut device = RecordingDevice::new();
        let mut sources = MemorySources::default();

        registry.index_for_features("--", false, false).unwrap();
        let realized = registry.realize_all(&mut device, &mut sources);

        assert_eq!(realized, vec![None]);
    }

    #[test]
    fn test_missing_source_is_an_error_not_a_panic() {
        let mut registry = registry();
        let mut device = RecordingDevice::new();
        let mut sources = MemorySources::default();

        let result = registry.resolve_or_compile(&mut device, &mut sources, "sky");
        assert!(result.is_err());
    }

    #[test]
    fn test_feature_list_parsing() {
        let (flags, post) = parse_feature_list("directional normalmap fog");
        assert_eq!(
            flags,
            ShaderFeatures::DIRECTIONAL_LIGHT
                | ShaderFeatures::NORMAL_MAP
                | ShaderFeatures::FOG
        );
        assert!(post.is_empty());

        let (flags, post) = parse_feature_list("postprocessing:vignette");
        assert!(flags.is_empty());
        assert_eq!(post, PostEffects::VIGNETTE);
    }
}
