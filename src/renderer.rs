use glam::{Mat4, Vec2, Vec3};
use glow::{Context, HasContext as _};

use crate::scene::{RIBBON_STRIDE, SceneGeometry, SurfaceBuffers, floor_color, ribbon_vertices};
use crate::session::SessionId;
use crate::view_state::SceneUniforms;

const MESH_VS: &str = r#"#version 300 es
    precision highp float;
    uniform mat4 u_view_proj;
    uniform mat4 u_model;
    layout(location = 0) in vec3 a_pos;
    layout(location = 1) in vec3 a_normal;
    out vec3 v_normal;
    void main() {
        v_normal    = a_normal;
        gl_Position = u_view_proj * u_model * vec4(a_pos, 1.0);
    }"#;

// Hemispheric fill plus one directional key light. Walls are single quads,
// so the key term is two-sided.
const MESH_FS: &str = r#"#version 300 es
    precision mediump float;
    uniform vec3  u_color;
    uniform vec3  u_light_dir;
    uniform float u_intensity;
    in  vec3 v_normal;
    out vec4 o_col;
    void main() {
        vec3  n    = length(v_normal) > 0.0 ? normalize(v_normal) : vec3(0.0, 1.0, 0.0);
        float hemi = 0.5 + 0.5 * n.y;
        float key  = abs(dot(n, normalize(-u_light_dir)));
        vec3  lit  = u_color * (0.35 * hemi + 0.65 * key) * u_intensity;
        o_col = vec4(min(lit, vec3(1.0)), 1.0);
    }"#;

// Segments arrive as two-triangle ribbons; each corner is pushed sideways in
// screen space by half the width, so thickness is in pixels on every backend.
const LINE_VS: &str = r#"#version 300 es
    precision highp float;
    uniform mat4  u_view_proj;
    uniform mat4  u_model;
    uniform vec2  u_viewport;
    uniform float u_width;
    layout(location = 0) in vec3  a_pos;
    layout(location = 1) in vec3  a_other;
    layout(location = 2) in vec3  a_col;
    layout(location = 3) in float a_side;
    out vec3 v_col;
    void main() {
        mat4 mvp  = u_view_proj * u_model;
        vec4 here = mvp * vec4(a_pos, 1.0);
        vec4 there = mvp * vec4(a_other, 1.0);
        vec2 sa  = here.xy / max(abs(here.w), 1e-5) * u_viewport;
        vec2 sb  = there.xy / max(abs(there.w), 1e-5) * u_viewport;
        vec2 dir = sb - sa;
        float len = length(dir);
        vec2 n   = len > 1e-6 ? vec2(-dir.y, dir.x) / len : vec2(0.0);
        vec2 offset = n * a_side * u_width / u_viewport;
        v_col       = a_col;
        gl_Position = here + vec4(offset * here.w, 0.0, 0.0);
    }"#;

const LINE_FS: &str = r#"#version 300 es
    precision mediump float;
    uniform vec3  u_tint;
    uniform float u_use_tint;
    in  vec3 v_col;
    out vec4 o_col;
    void main() { o_col = vec4(mix(v_col, u_tint, u_use_tint), 1.0); }"#;

const KEY_LIGHT_DIR: Vec3 = Vec3::new(-1.0, -2.0, -1.0);
/// Axis width in points; independent of the edge quality setting.
const AXIS_WIDTH: f32 = 2.0;

/// Everything a paint call needs, copied into the egui callback.
#[derive(Debug, Clone, Copy)]
pub struct FrameUniforms {
    pub view_proj: Mat4,
    pub scene: SceneUniforms,
}

struct Program {
    program: glow::Program,
    u_view_proj: Option<glow::UniformLocation>,
    u_model: Option<glow::UniformLocation>,
}

impl Program {
    unsafe fn new(gl: &Context, vs_src: &str, fs_src: &str) -> Result<Self, String> {
        unsafe {
            let program = gl.create_program()?;
            let mut shaders = Vec::with_capacity(2);
            for (kind, src) in [(glow::VERTEX_SHADER, vs_src), (glow::FRAGMENT_SHADER, fs_src)] {
                let shader = gl.create_shader(kind)?;
                gl.shader_source(shader, src);
                gl.compile_shader(shader);
                if !gl.get_shader_compile_status(shader) {
                    let info = gl.get_shader_info_log(shader);
                    gl.delete_shader(shader);
                    gl.delete_program(program);
                    return Err(format!("shader compile failed: {info}"));
                }
                gl.attach_shader(program, shader);
                shaders.push(shader);
            }
            gl.link_program(program);
            for shader in shaders {
                gl.detach_shader(program, shader);
                gl.delete_shader(shader);
            }
            if !gl.get_program_link_status(program) {
                let info = gl.get_program_info_log(program);
                gl.delete_program(program);
                return Err(format!("program link failed: {info}"));
            }
            Ok(Self {
                program,
                u_view_proj: gl.get_uniform_location(program, "u_view_proj"),
                u_model: gl.get_uniform_location(program, "u_model"),
            })
        }
    }

    unsafe fn bind(&self, gl: &Context, view_proj: &Mat4, model: &Mat4) {
        unsafe {
            gl.use_program(Some(self.program));
            gl.uniform_matrix_4_f32_slice(self.u_view_proj.as_ref(), false, &view_proj.to_cols_array());
            gl.uniform_matrix_4_f32_slice(self.u_model.as_ref(), false, &model.to_cols_array());
        }
    }

    unsafe fn uniform(&self, gl: &Context, name: &str) -> Option<glow::UniformLocation> {
        unsafe { gl.get_uniform_location(self.program, name) }
    }

    unsafe fn destroy(&self, gl: &Context) {
        unsafe { gl.delete_program(self.program) }
    }
}

/// Indexed triangles with per-vertex normals.
struct MeshBatch {
    vao: glow::VertexArray,
    vbo_pos: glow::Buffer,
    vbo_normal: glow::Buffer,
    ebo: glow::Buffer,
    index_count: i32,
}

impl MeshBatch {
    unsafe fn new(gl: &Context, buffers: &SurfaceBuffers) -> Result<Self, String> {
        unsafe {
            let vao = gl.create_vertex_array()?;
            let vbo_pos = gl.create_buffer()?;
            let vbo_normal = gl.create_buffer()?;
            let ebo = gl.create_buffer()?;

            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo_pos));
            gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, bytemuck::cast_slice(&buffers.positions), glow::STATIC_DRAW);
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, 12, 0);

            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo_normal));
            gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, bytemuck::cast_slice(&buffers.normals), glow::STATIC_DRAW);
            gl.enable_vertex_attrib_array(1);
            gl.vertex_attrib_pointer_f32(1, 3, glow::FLOAT, false, 12, 0);

            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ebo));
            gl.buffer_data_u8_slice(glow::ELEMENT_ARRAY_BUFFER, bytemuck::cast_slice(&buffers.indices), glow::STATIC_DRAW);
            gl.bind_vertex_array(None);

            Ok(Self {
                vao,
                vbo_pos,
                vbo_normal,
                ebo,
                index_count: buffers.indices.len() as i32,
            })
        }
    }

    unsafe fn draw(&self, gl: &Context) {
        unsafe {
            gl.bind_vertex_array(Some(self.vao));
            gl.draw_elements(glow::TRIANGLES, self.index_count, glow::UNSIGNED_INT, 0);
        }
    }

    unsafe fn destroy(&self, gl: &Context) {
        unsafe {
            gl.delete_vertex_array(self.vao);
            gl.delete_buffer(self.vbo_pos);
            gl.delete_buffer(self.vbo_normal);
            gl.delete_buffer(self.ebo);
        }
    }
}

/// Line segments expanded to ribbons, see [`ribbon_vertices`].
struct RibbonBatch {
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    vertex_count: i32,
}

impl RibbonBatch {
    unsafe fn new(gl: &Context, lines: &[f32]) -> Result<Self, String> {
        let verts = ribbon_vertices(lines);
        unsafe {
            let vao = gl.create_vertex_array()?;
            let vbo = gl.create_buffer()?;
            let stride = (RIBBON_STRIDE * std::mem::size_of::<f32>()) as i32;

            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, bytemuck::cast_slice(&verts), glow::STATIC_DRAW);
            for (index, size, offset) in [(0, 3, 0), (1, 3, 12), (2, 3, 24), (3, 1, 36)] {
                gl.enable_vertex_attrib_array(index);
                gl.vertex_attrib_pointer_f32(index, size, glow::FLOAT, false, stride, offset);
            }
            gl.bind_vertex_array(None);

            Ok(Self {
                vao,
                vbo,
                vertex_count: (verts.len() / RIBBON_STRIDE) as i32,
            })
        }
    }

    unsafe fn draw(&self, gl: &Context) {
        unsafe {
            gl.bind_vertex_array(Some(self.vao));
            gl.draw_arrays(glow::TRIANGLES, 0, self.vertex_count);
        }
    }

    unsafe fn destroy(&self, gl: &Context) {
        unsafe {
            gl.delete_vertex_array(self.vao);
            gl.delete_buffer(self.vbo);
        }
    }
}

/// GPU copy of one session's scene.
pub struct GpuScene {
    session: SessionId,
    mesh_program: Program,
    line_program: Program,
    u_color: Option<glow::UniformLocation>,
    u_light_dir: Option<glow::UniformLocation>,
    u_intensity: Option<glow::UniformLocation>,
    u_tint: Option<glow::UniformLocation>,
    u_use_tint: Option<glow::UniformLocation>,
    u_viewport: Option<glow::UniformLocation>,
    u_width: Option<glow::UniformLocation>,
    walls: MeshBatch,
    floor: MeshBatch,
    edges: RibbonBatch,
    axes: RibbonBatch,
}

// GL handles are plain ids; they are only touched from the painting thread.
unsafe impl Send for GpuScene {}
unsafe impl Sync for GpuScene {}

impl GpuScene {
    /// Uploads `geometry`. On failure every object created so far is deleted.
    pub unsafe fn new(gl: &Context, session: SessionId, geometry: &SceneGeometry) -> Result<Self, String> {
        unsafe {
            let mesh_program = Program::new(gl, MESH_VS, MESH_FS);
            let line_program = Program::new(gl, LINE_VS, LINE_FS);
            let walls = MeshBatch::new(gl, &geometry.walls);
            let floor = MeshBatch::new(gl, &geometry.floor);
            let edges = RibbonBatch::new(gl, &geometry.edge_lines);
            let axes = RibbonBatch::new(gl, &geometry.axis_lines);

            let (mesh_program, line_program, walls, floor, edges, axes) =
                match (mesh_program, line_program, walls, floor, edges, axes) {
                    (Ok(mp), Ok(lp), Ok(w), Ok(f), Ok(e), Ok(a)) => (mp, lp, w, f, e, a),
                    (mp, lp, w, f, e, a) => {
                        let mut errors = Vec::new();
                        release_built([mp, lp], |p| p.destroy(gl), &mut errors);
                        release_built([w, f], |b| b.destroy(gl), &mut errors);
                        release_built([e, a], |b| b.destroy(gl), &mut errors);
                        return Err(errors.join("; "));
                    }
                };

            let scene = Self {
                session,
                u_color: mesh_program.uniform(gl, "u_color"),
                u_light_dir: mesh_program.uniform(gl, "u_light_dir"),
                u_intensity: mesh_program.uniform(gl, "u_intensity"),
                u_tint: line_program.uniform(gl, "u_tint"),
                u_use_tint: line_program.uniform(gl, "u_use_tint"),
                u_viewport: line_program.uniform(gl, "u_viewport"),
                u_width: line_program.uniform(gl, "u_width"),
                walls,
                floor,
                edges,
                axes,
                mesh_program,
                line_program,
            };
            log::debug!(
                "GPU buffers for session {session}: {} indices, {} edge vertices",
                scene.walls.index_count,
                scene.edges.vertex_count
            );
            Ok(scene)
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// `viewport_px` is the callback's viewport in physical pixels; widths in
    /// `frame` are in points and scaled by `pixels_per_point`.
    pub unsafe fn paint(&self, gl: &Context, frame: &FrameUniforms, viewport_px: Vec2, pixels_per_point: f32) {
        let u = &frame.scene;
        unsafe {
            gl.enable(glow::DEPTH_TEST);
            gl.depth_func(glow::LEQUAL);
            gl.depth_mask(true);
            gl.clear(glow::DEPTH_BUFFER_BIT);
            gl.disable(glow::CULL_FACE);

            if u.draw_floor || u.draw_walls {
                self.mesh_program.bind(gl, &frame.view_proj, &Mat4::IDENTITY);
                gl.uniform_3_f32_slice(self.u_light_dir.as_ref(), &KEY_LIGHT_DIR.to_array());
                gl.uniform_1_f32(self.u_intensity.as_ref(), u.light_intensity);
                if u.draw_floor {
                    gl.uniform_3_f32_slice(self.u_color.as_ref(), &floor_color().to_array());
                    self.floor.draw(gl);
                }
                if u.draw_walls {
                    // push walls slightly back so their outlines win the depth test
                    gl.enable(glow::POLYGON_OFFSET_FILL);
                    gl.polygon_offset(1.0, 1.0);
                    self.mesh_program.bind(gl, &frame.view_proj, &u.wall_model);
                    gl.uniform_3_f32_slice(self.u_color.as_ref(), &u.wall_color.to_array());
                    self.walls.draw(gl);
                    gl.disable(glow::POLYGON_OFFSET_FILL);
                }
            }

            if u.draw_edges || u.draw_axes {
                let viewport = viewport_px.max(Vec2::ONE);
                if u.draw_edges {
                    self.line_program.bind(gl, &frame.view_proj, &u.wall_model);
                    gl.uniform_2_f32(self.u_viewport.as_ref(), viewport.x, viewport.y);
                    gl.uniform_1_f32(self.u_width.as_ref(), u.edge_width * pixels_per_point);
                    gl.uniform_3_f32_slice(self.u_tint.as_ref(), &u.wall_color.to_array());
                    gl.uniform_1_f32(self.u_use_tint.as_ref(), if u.edges_only { 1.0 } else { 0.0 });
                    self.edges.draw(gl);
                }
                if u.draw_axes {
                    self.line_program.bind(gl, &frame.view_proj, &Mat4::IDENTITY);
                    gl.uniform_2_f32(self.u_viewport.as_ref(), viewport.x, viewport.y);
                    gl.uniform_1_f32(self.u_width.as_ref(), AXIS_WIDTH * pixels_per_point);
                    gl.uniform_1_f32(self.u_use_tint.as_ref(), 0.0);
                    self.axes.draw(gl);
                }
            }

            gl.bind_vertex_array(None);
            gl.use_program(None);
            gl.disable(glow::DEPTH_TEST);
        }
    }

    /// Releases every GL object. The scene must not be painted afterwards.
    pub unsafe fn destroy(&self, gl: &Context) {
        unsafe {
            self.walls.destroy(gl);
            self.floor.destroy(gl);
            self.edges.destroy(gl);
            self.axes.destroy(gl);
            self.mesh_program.destroy(gl);
            self.line_program.destroy(gl);
        }
        log::debug!("GPU buffers for session {} released", self.session);
    }
}

/// Releases the parts that were built and collects the errors of the rest.
fn release_built<T, const N: usize>(
    parts: [Result<T, String>; N],
    mut release: impl FnMut(T),
    errors: &mut Vec<String>,
) {
    for part in parts {
        match part {
            Ok(built) => release(built),
            Err(e) => errors.push(e),
        }
    }
}
