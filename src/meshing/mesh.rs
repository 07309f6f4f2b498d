//! Indexed triangle meshes with a fixed capacity.
//!
//! A mesh never grows past its [`MeshLimits`]. Pushing a quad that would
//! exceed them is refused with an overflow error and leaves the mesh as it
//! was, so the caller decides whether to discard or split.

use cgmath::Point3;

use super::face::Face;
use super::vertex::Vertex;
use crate::config::TerrainConfig;
use crate::error::{TerrainError, TerrainResult};

/// Vertex and index capacity of a mesh.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MeshLimits {
    /// Largest vertex count a mesh may reach.
    pub max_vertices: usize,
    /// Largest index count a mesh may reach.
    pub max_indices: usize,
}

impl MeshLimits {
    /// Creates limits from explicit capacities.
    pub const fn new(max_vertices: usize, max_indices: usize) -> Self {
        Self {
            max_vertices,
            max_indices,
        }
    }

    /// The capacities configured for extraction and mesh slots.
    pub fn from_config(config: &TerrainConfig) -> Self {
        Self::new(config.max_vertices, config.max_indices)
    }

    /// The tighter of two limits on each axis.
    pub fn min(self, other: MeshLimits) -> MeshLimits {
        Self::new(
            self.max_vertices.min(other.max_vertices),
            self.max_indices.min(other.max_indices),
        )
    }
}

/// An indexed triangle mesh for one extracted region.
///
/// Vertex positions are relative to [`Mesh::origin`], the lower corner of the
/// region the mesh was extracted from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mesh {
    origin: Point3<i32>,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    limits: MeshLimits,
}

impl Mesh {
    /// Vertices emitted per quad.
    pub const VERTICES_PER_QUAD: usize = 4;
    /// Indices emitted per quad.
    pub const INDICES_PER_QUAD: usize = 6;

    /// Creates an empty mesh bounded by `limits` without reserving memory.
    pub fn new(limits: MeshLimits) -> Self {
        Mesh {
            origin: Point3::new(0, 0, 0),
            vertices: Vec::new(),
            indices: Vec::new(),
            limits,
        }
    }

    /// Creates an empty mesh with buffers reserved for its full capacity.
    pub fn with_capacity(limits: MeshLimits) -> Self {
        Mesh {
            origin: Point3::new(0, 0, 0),
            vertices: Vec::with_capacity(limits.max_vertices),
            indices: Vec::with_capacity(limits.max_indices),
            limits,
        }
    }

    /// Lower corner of the extracted region.
    pub fn origin(&self) -> Point3<i32> {
        self.origin
    }

    /// Capacity of this mesh.
    pub fn limits(&self) -> MeshLimits {
        self.limits
    }

    /// The vertex buffer.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// The index buffer. Every three indices form one triangle.
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Returns `true` if the mesh holds no geometry.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Empties the buffers, keeping their allocations.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    /// Empties the buffers and moves the mesh to a new origin.
    pub fn reset(&mut self, origin: Point3<i32>) {
        self.clear();
        self.origin = origin;
    }

    /// Appends one quad, refusing it if either `limits` or the mesh's own
    /// limits would be exceeded.
    ///
    /// # Errors
    /// Returns [`TerrainError::Overflow`] with the counts the mesh would have
    /// reached. The mesh is left unchanged.
    pub fn push_quad(&mut self, face: &Face, limits: MeshLimits) -> TerrainResult<()> {
        let limits = self.limits.min(limits);
        let vertices = self.vertices.len() + Self::VERTICES_PER_QUAD;
        let indices = self.indices.len() + Self::INDICES_PER_QUAD;
        if vertices > limits.max_vertices || indices > limits.max_indices {
            return Err(TerrainError::Overflow {
                vertices,
                indices,
                max_vertices: limits.max_vertices,
                max_indices: limits.max_indices,
            });
        }

        let base = self.vertices.len() as u32;
        self.vertices.extend(Self::generate_face_vertices(face));
        self.indices.extend(Self::generate_face_indices(base));
        Ok(())
    }

    /// The four corner vertices of a face, ordered `ll, lr, ul, ur`.
    pub fn generate_face_vertices(face: &Face) -> [Vertex; 4] {
        [face.ll, face.lr, face.ul, face.ur].map(|corner| Vertex::new(corner, face.side, face.material))
    }

    /// Two counter-clockwise triangles over the four vertices starting at
    /// `base`: `(ll, lr, ur)` and `(ll, ur, ul)`.
    pub fn generate_face_indices(base: u32) -> [u32; 6] {
        [base, base + 1, base + 3, base, base + 3, base + 2]
    }

    /// Returns `true` if every index refers to an existing vertex and the
    /// index count is a whole number of triangles.
    pub fn indices_are_valid(&self) -> bool {
        let vertex_count = self.vertices.len();
        self.indices.len() % 3 == 0 && self.indices.iter().all(|&i| (i as usize) < vertex_count)
    }
}
