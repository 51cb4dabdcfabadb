//! Test doubles for the rendering subsystem
//!
//! A recording [`GraphicsDevice`] that captures every call for sequencing
//! assertions, an in-memory shader source provider, and a fake asset source
//! implementing all three collaborator traits.

use std::collections::{HashMap, HashSet};

use crate::assets::{MeshHandles, ObjectSource, ParticleHandles, ParticleSource, TerrainSource};
use crate::foundation::math::{Mat3, Mat4, Vec2, Vec3, Vec4};
use crate::render::device::{
    BlendMode, BufferId, CullFace, DepthFunc, FramebufferId, GraphicsDevice, OffscreenTarget,
    ProgramId, StencilFace, StencilFunc, StencilOp, TextureId, UniformLocation, VertexArrayId,
};
use crate::render::shader::{ShaderCatalog, ShaderSourceProvider};
use crate::render::BackendResult;
use crate::scene::placement::disc_instance_count;
use crate::scene::{ChunkData, ParticleGroup};

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    CompileProgram(ProgramId),
    UseProgram(ProgramId),
    SetUniformI32(UniformLocation, i32),
    SetUniformF32(UniformLocation, f32),
    SetUniformVec2(UniformLocation),
    SetUniformVec3(UniformLocation, Vec3),
    SetUniformVec4(UniformLocation),
    SetUniformMat3(UniformLocation),
    SetUniformMat4(UniformLocation),
    BindVertexArray(VertexArrayId),
    BindTexture(u32, TextureId),
    DrawTriangles(u32),
    DrawTriangleStrip(u32),
    DrawTrianglesInstanced(u32, u32),
    CreateFullscreenQuad(VertexArrayId),
    SetClearColour,
    Clear,
    SetDepthTest(bool),
    SetDepthWrite(bool),
    SetDepthFunction(DepthFunc),
    SetBlend(Option<BlendMode>),
    SetCullFace(Option<CullFace>),
    SetColourWrites(bool),
    SetStencilTest(bool),
    SetStencilFunc(StencilFunc),
    SetStencilOp(StencilFace, StencilOp, StencilOp, StencilOp),
    CreateOffscreenTarget(u32),
    BindFramebuffer(FramebufferId),
    SetViewport(u32, u32),
    BlitDepth(FramebufferId, FramebufferId),
}

/// Records every device call and hands out incrementing handles
pub struct RecordingDevice {
    calls: Vec<DeviceCall>,
    next_program: u32,
    next_vao: u32,
    next_texture: u32,
    next_framebuffer: u32,
    next_location: i32,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self {
            // Handle 0 is the backbuffer; start allocations above it
            next_program: 0,
            next_vao: 100,
            next_texture: 200,
            next_framebuffer: 0,
            next_location: 0,
            calls: Vec::new(),
        }
    }

    /// All recorded calls in order
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    /// Number of calls matching a predicate
    pub fn count(&self, predicate: impl Fn(&DeviceCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    /// Index of the first call matching a predicate
    pub fn index_of(&self, predicate: impl Fn(&DeviceCall) -> bool) -> Option<usize> {
        self.calls.iter().position(|call| predicate(call))
    }

    /// Number of programs compiled so far
    pub fn compile_count(&self) -> usize {
        self.count(|call| matches!(call, DeviceCall::CompileProgram(_)))
    }
}

impl GraphicsDevice for RecordingDevice {
    fn compile_program(
        &mut self,
        _vertex_source: &str,
        _fragment_source: &str,
    ) -> BackendResult<ProgramId> {
        self.next_program += 1;
        let program = ProgramId(self.next_program);
        self.calls.push(DeviceCall::CompileProgram(program));
        Ok(program)
    }

    fn use_program(&mut self, program: ProgramId) {
        self.calls.push(DeviceCall::UseProgram(program));
    }

    fn uniform_location(&mut self, _program: ProgramId, _name: &str) -> Option<UniformLocation> {
        self.next_location += 1;
        Some(UniformLocation(self.next_location))
    }

    fn set_uniform_i32(&mut self, location: UniformLocation, value: i32) {
        self.calls.push(DeviceCall::SetUniformI32(location, value));
    }

    fn set_uniform_f32(&mut self, location: UniformLocation, value: f32) {
        self.calls.push(DeviceCall::SetUniformF32(location, value));
    }

    fn set_uniform_vec2(&mut self, location: UniformLocation, _value: &Vec2) {
        self.calls.push(DeviceCall::SetUniformVec2(location));
    }

    fn set_uniform_vec3(&mut self, location: UniformLocation, value: &Vec3) {
        self.calls.push(DeviceCall::SetUniformVec3(location, *value));
    }

    fn set_uniform_vec4(&mut self, location: UniformLocation, _value: &Vec4) {
        self.calls.push(DeviceCall::SetUniformVec4(location));
    }

    fn set_uniform_mat3(&mut self, location: UniformLocation, _value: &Mat3) {
        self.calls.push(DeviceCall::SetUniformMat3(location));
    }

    fn set_uniform_mat4(&mut self, location: UniformLocation, _value: &Mat4) {
        self.calls.push(DeviceCall::SetUniformMat4(location));
    }

    fn bind_vertex_array(&mut self, vao: VertexArrayId) {
        self.calls.push(DeviceCall::BindVertexArray(vao));
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.calls.push(DeviceCall::BindTexture(unit, texture));
    }

    fn draw_triangles(&mut self, vertex_count: u32) {
        self.calls.push(DeviceCall::DrawTriangles(vertex_count));
    }

    fn draw_triangle_strip(&mut self, vertex_count: u32) {
        self.calls.push(DeviceCall::DrawTriangleStrip(vertex_count));
    }

    fn draw_triangles_instanced(&mut self, vertex_count: u32, instance_count: u32) {
        self.calls
            .push(DeviceCall::DrawTrianglesInstanced(vertex_count, instance_count));
    }

    fn create_fullscreen_quad(&mut self) -> BackendResult<VertexArrayId> {
        self.next_vao += 1;
        let vao = VertexArrayId(self.next_vao);
        self.calls.push(DeviceCall::CreateFullscreenQuad(vao));
        Ok(vao)
    }

    fn set_clear_colour(&mut self, _r: f32, _g: f32, _b: f32, _a: f32) {
        self.calls.push(DeviceCall::SetClearColour);
    }

    fn clear_colour_and_depth(&mut self) {
        self.calls.push(DeviceCall::Clear);
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.calls.push(DeviceCall::SetDepthTest(enabled));
    }

    fn set_depth_write(&mut self, enabled: bool) {
        self.calls.push(DeviceCall::SetDepthWrite(enabled));
    }

    fn set_depth_function(&mut self, func: DepthFunc) {
        self.calls.push(DeviceCall::SetDepthFunction(func));
    }

    fn set_blend(&mut self, mode: Option<BlendMode>) {
        self.calls.push(DeviceCall::SetBlend(mode));
    }

    fn set_cull_face(&mut self, face: Option<CullFace>) {
        self.calls.push(DeviceCall::SetCullFace(face));
    }

    fn set_colour_writes(&mut self, enabled: bool) {
        self.calls.push(DeviceCall::SetColourWrites(enabled));
    }

    fn set_stencil_test(&mut self, enabled: bool) {
        self.calls.push(DeviceCall::SetStencilTest(enabled));
    }

    fn set_stencil_func(&mut self, func: StencilFunc) {
        self.calls.push(DeviceCall::SetStencilFunc(func));
    }

    fn set_stencil_op(
        &mut self,
        face: StencilFace,
        stencil_fail: StencilOp,
        depth_fail: StencilOp,
        depth_pass: StencilOp,
    ) {
        self.calls
            .push(DeviceCall::SetStencilOp(face, stencil_fail, depth_fail, depth_pass));
    }

    fn create_offscreen_target(
        &mut self,
        _width: u32,
        _height: u32,
        colour_attachments: u32,
    ) -> BackendResult<OffscreenTarget> {
        self.next_framebuffer += 1;
        let framebuffer = FramebufferId(self.next_framebuffer);

        let colour_textures = (0..colour_attachments)
            .map(|_| {
                self.next_texture += 1;
                TextureId(self.next_texture)
            })
            .collect();

        self.calls
            .push(DeviceCall::CreateOffscreenTarget(colour_attachments));

        Ok(OffscreenTarget {
            framebuffer,
            colour_textures,
        })
    }

    fn bind_framebuffer(&mut self, framebuffer: FramebufferId) {
        self.calls.push(DeviceCall::BindFramebuffer(framebuffer));
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.calls.push(DeviceCall::SetViewport(width, height));
    }

    fn blit_depth(&mut self, from: FramebufferId, to: FramebufferId, _width: u32, _height: u32) {
        self.calls.push(DeviceCall::BlitDepth(from, to));
    }
}

/// In-memory shader source provider
#[derive(Default)]
pub struct MemorySources {
    sources: HashMap<String, String>,
}

impl MemorySources {
    /// Provider with placeholder source text for every catalog entry
    pub fn with_catalog_sources(catalog: &ShaderCatalog) -> Self {
        let mut sources = HashMap::new();
        for (name, description) in catalog.entries() {
            sources.insert(
                description.vertex_path.clone(),
                format!("// vertex: {name}"),
            );
            sources.insert(
                description.fragment_path.clone(),
                format!("// fragment: {name}"),
            );
        }
        Self { sources }
    }
}

impl ShaderSourceProvider for MemorySources {
    fn load_source(&mut self, path: &str) -> Option<String> {
        self.sources.get(path).cloned()
    }
}

/// Fake asset source implementing all three collaborator traits
#[derive(Clone)]
pub struct FakeAssets {
    transparent: HashSet<String>,
    missing: HashSet<String>,
    vertex_count: u32,
}

impl Default for FakeAssets {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeAssets {
    pub fn new() -> Self {
        Self {
            transparent: HashSet::new(),
            missing: HashSet::new(),
            vertex_count: 30,
        }
    }

    /// Mark an object's texture as alpha-transparent
    pub fn mark_transparent(&mut self, name: &str) {
        self.transparent.insert(name.to_string());
    }

    /// Make lookups for a name fail
    pub fn forget(&mut self, name: &str) {
        self.missing.insert(name.to_string());
    }

    /// Vertex count reported for every mesh
    pub fn set_vertex_count(&mut self, vertex_count: u32) {
        self.vertex_count = vertex_count;
    }

    fn mesh(&self) -> MeshHandles {
        MeshHandles {
            vao: VertexArrayId(1),
            vertex_buffers: vec![BufferId(2), BufferId(3)],
            vertex_count: self.vertex_count,
            texture: TextureId(4),
            normal_texture: Some(TextureId(5)),
        }
    }
}

impl ObjectSource for FakeAssets {
    fn rendering_data(&mut self, name: &str) -> Option<MeshHandles> {
        if self.missing.contains(name) {
            return None;
        }
        Some(self.mesh())
    }

    fn is_texture_transparent(&mut self, name: &str) -> bool {
        self.transparent.contains(name)
    }
}

impl TerrainSource for FakeAssets {
    fn rendering_data(&mut self, name: &str) -> Option<MeshHandles> {
        if self.missing.contains(name) {
            return None;
        }
        Some(self.mesh())
    }

    fn chunk_side_length(&mut self, _name: &str) -> f32 {
        100.0
    }

    fn height(&mut self, _ox: f32, _oz: f32, _chunk: &str, _x: f32, _z: f32) -> f32 {
        0.0
    }
}

impl ParticleSource for FakeAssets {
    fn rendering_data(
        &mut self,
        group: &ParticleGroup,
        _chunk: &ChunkData,
        object: &MeshHandles,
    ) -> Option<ParticleHandles> {
        if self.missing.contains(group.name.as_str()) {
            return None;
        }
        Some(ParticleHandles {
            object: object.clone(),
            offset_buffer: BufferId(20),
            rotation_buffer: BufferId(21),
            particle_count: disc_instance_count(group.density, group.radius) as u32,
        })
    }
}
