use std::path::PathBuf;

/// Errors that can occur while baking.
#[derive(Debug, thiserror::Error)]
pub enum BakeError {
    /// I/O error reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode or encode an image.
    #[error("Image error for {path}: {message}")]
    Image { path: PathBuf, message: String },

    /// Failed to parse an OBJ mesh file.
    #[error("OBJ parse error for {path}: {message}")]
    ObjParse { path: PathBuf, message: String },

    /// The project has never been saved, so there is nowhere to cache renders.
    #[error("Project must be saved before baking (no path to store renders)")]
    UnsavedProject,

    /// A required input is missing (collection, camera, scenario or render).
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// Input validation failed (sizes, thresholds, empty meshes, etc.).
    #[error("Validation error: {0}")]
    Validation(String),

    /// A UV island does not fit an empty nestmap page in any orientation.
    #[error(
        "Island {island} of {object} is {width}x{height} pixels and does not fit a {page_width}x{page_height} page"
    )]
    UnplaceableIsland {
        object: String,
        island: usize,
        width: u32,
        height: u32,
        page_width: u32,
        page_height: u32,
    },

    /// Two exported objects produce the same script identifier.
    #[error("Identifier collision: {identifier} is produced by both {name_a} and {name_b}")]
    IdentifierCollision {
        identifier: String,
        name_a: String,
        name_b: String,
    },

    /// An internal invariant of the nesting engine was violated.
    #[error("Consistency error: {0}")]
    Consistency(String),
}
