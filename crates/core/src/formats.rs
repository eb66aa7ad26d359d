//! Supported upload formats and how they route to processing jobs.

use crate::jobs::JobType;

pub const MESH_EXTENSIONS: &[&str] = &["obj", "fbx", "gltf", "glb", "dae", "ply", "stl", "abc"];

/// PLY is routed as a mesh; point-cloud PLY must be re-exported as LAS/E57.
pub const POINTCLOUD_EXTENSIONS: &[&str] = &["las", "laz", "e57"];

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tiff", "tif", "tga", "exr", "bmp", "dds"];

pub const ALIGNMENT_EXTENSIONS: &[&str] = &["csv", "txt", "xml"];

pub const SPLAT_EXTENSIONS: &[&str] = &["splat"];

/// Storage category an uploaded asset is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetCategory {
    Meshes,
    PointClouds,
    Splats,
    Textures,
    Alignment,
}

impl AssetCategory {
    /// Directory name under the project's raw tree.
    pub fn dir_name(self) -> &'static str {
        match self {
            AssetCategory::Meshes => "Meshes",
            AssetCategory::PointClouds => "PointClouds",
            AssetCategory::Splats => "Splats",
            AssetCategory::Textures => "Textures",
            AssetCategory::Alignment => "Alignment",
        }
    }

    /// The processing job an upload of this category triggers, if any.
    pub fn job_type(self) -> Option<JobType> {
        match self {
            AssetCategory::Meshes => Some(JobType::Mesh),
            AssetCategory::PointClouds => Some(JobType::PointCloud),
            AssetCategory::Splats => Some(JobType::GaussianSplat),
            AssetCategory::Textures | AssetCategory::Alignment => None,
        }
    }
}

/// Classify a file extension (case-insensitive, leading dot optional).
pub fn category_for_extension(ext: &str) -> Option<AssetCategory> {
    let ext = ext.trim_start_matches('.').to_ascii_lowercase();
    let ext = ext.as_str();
    if MESH_EXTENSIONS.contains(&ext) {
        Some(AssetCategory::Meshes)
    } else if POINTCLOUD_EXTENSIONS.contains(&ext) {
        Some(AssetCategory::PointClouds)
    } else if SPLAT_EXTENSIONS.contains(&ext) {
        Some(AssetCategory::Splats)
    } else if IMAGE_EXTENSIONS.contains(&ext) {
        Some(AssetCategory::Textures)
    } else if ALIGNMENT_EXTENSIONS.contains(&ext) {
        Some(AssetCategory::Alignment)
    } else {
        None
    }
}

pub fn is_allowed(ext: &str) -> bool {
    category_for_extension(ext).is_some()
}

/// Every accepted extension, without duplicates, in table order.
pub fn all_extensions() -> Vec<&'static str> {
    let mut all: Vec<&'static str> = Vec::new();
    for list in [
        MESH_EXTENSIONS,
        POINTCLOUD_EXTENSIONS,
        IMAGE_EXTENSIONS,
        ALIGNMENT_EXTENSIONS,
        SPLAT_EXTENSIONS,
    ] {
        for ext in list {
            if !all.contains(ext) {
                all.push(ext);
            }
        }
    }
    all
}

/// Value for an HTML `accept` attribute, e.g. `.obj,.fbx,...`.
pub fn accept_attribute() -> String {
    all_extensions()
        .iter()
        .map(|e| format!(".{e}"))
        .collect::<Vec<_>>()
        .join(",")
}
