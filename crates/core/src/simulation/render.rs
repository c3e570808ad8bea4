//! GPU-ready snapshot of the surface shading data.

use bytemuck::{Pod, Zeroable};

use crate::grid::{GridResolution, Heightfield};

/// Per-sample vertex record, tightly packed for direct buffer upload.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SurfaceVertex {
    pub height: f32,
    pub normal: [f32; 3],
    /// xyz direction, w handedness
    pub tangent: [f32; 4],
}

/// Vertex records of every interior sample, row-major.
#[derive(Debug, Clone)]
pub struct RenderFrame {
    pub resolution: GridResolution,
    pub vertices: Vec<SurfaceVertex>,
}

impl RenderFrame {
    pub fn from_field(field: &Heightfield) -> Self {
        let vertices = (0..field.resolution().sample_count())
            .map(|i| {
                let n = field.normals()[i];
                let t = field.tangents()[i];
                SurfaceVertex {
                    height: field.height(i),
                    normal: [n.x, n.y, n.z],
                    tangent: [t.x, t.y, t.z, t.w],
                }
            })
            .collect();
        Self {
            resolution: field.resolution(),
            vertices,
        }
    }

    /// Raw bytes for a vertex buffer.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::Vec2;

    #[test]
    fn test_vertex_layout_is_packed() {
        assert_eq!(std::mem::size_of::<SurfaceVertex>(), 32);
    }

    #[test]
    fn test_frame_of_flat_field() {
        let res = GridResolution::new(4, 3).unwrap();
        let mut field = Heightfield::new(res, Vec2::new(3.0, 2.0)).unwrap();
        field.add_height(5, 0.25);
        let frame = RenderFrame::from_field(&field);
        assert_eq!(frame.vertices.len(), 12);
        assert_eq!(frame.vertices[5].height, 0.25);
        assert_eq!(frame.vertices[0].normal, [0.0, 1.0, 0.0]);
        assert_eq!(frame.as_bytes().len(), 12 * 32);
    }
}
