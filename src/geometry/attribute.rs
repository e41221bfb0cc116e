use std::fmt;
use std::sync::Arc;

/// Key of a per-element attribute list.
///
/// The well-known attributes have their own variants; anything else is a
/// [`Named`](Attribute::Named) attribute compared by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    Coordinates,
    Normals,
    Colors,
    TextureCoordinates,
    Labels,
    Indices,
    RelativeRadii,
    PointSize,
    Named(Arc<str>),
}

impl Attribute {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Attribute::Coordinates => "coordinates",
            Attribute::Normals => "normals",
            Attribute::Colors => "colors",
            Attribute::TextureCoordinates => "texture coordinates",
            Attribute::Labels => "labels",
            Attribute::Indices => "indices",
            Attribute::RelativeRadii => "relative radii",
            Attribute::PointSize => "point size",
            Attribute::Named(name) => name,
        }
    }

    /// Well-known attribute with this name, or a named one.
    #[must_use]
    pub fn for_name(name: &str) -> Self {
        match name {
            "coordinates" => Attribute::Coordinates,
            "normals" => Attribute::Normals,
            "colors" => Attribute::Colors,
            "texture coordinates" => Attribute::TextureCoordinates,
            "labels" => Attribute::Labels,
            "indices" => Attribute::Indices,
            "relative radii" => Attribute::RelativeRadii,
            "point size" => Attribute::PointSize,
            other => Attribute::Named(Arc::from(other)),
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Element category of a geometry. Each category has its own entry count
/// and its own attribute lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Vertex,
    Edge,
    Face,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Vertex, Category::Edge, Category::Face];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Category::Vertex => "vertex",
            Category::Edge => "edge",
            Category::Face => "face",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
