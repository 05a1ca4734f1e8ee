//! Zarr V3 container for grid cubes.
//!
//! A cube is stored as a single-chunk `float64` array (fill NaN) at the root
//! of a filesystem store. The flat coordinate metadata goes into the array
//! attributes together with the write date.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zarrs::array::{Array, ArrayBuilder, DataType, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs_filesystem::FilesystemStore;

use crate::cube::GridCube;
use crate::error::{GridError, Result};
use crate::metadata::CoordinateMetadata;

/// Summary of a completed cube write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CubeWriteResult {
    pub path: PathBuf,
    pub shape: Vec<usize>,
    pub bytes_written: u64,
    pub written_at: DateTime<Utc>,
}

/// Writes [`GridCube`]s as Zarr arrays, replacing anything at the target.
#[derive(Debug, Clone, Default)]
pub struct CubeWriter;

impl CubeWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn write(&self, path: impl AsRef<Path>, cube: &GridCube) -> Result<CubeWriteResult> {
        let path = path.as_ref();
        if cube.shape.is_empty() || cube.shape.contains(&0) {
            return Err(GridError::invalid_request(format!(
                "cannot store a cube of shape {:?}",
                cube.shape
            )));
        }

        remove_existing(path)?;
        std::fs::create_dir_all(path)?;
        let store = Arc::new(FilesystemStore::new(path).map_err(|e| GridError::container(e.to_string()))?);

        let shape: Vec<u64> = cube.shape.iter().map(|&n| n as u64).collect();
        let chunk_grid: zarrs::array::ChunkGrid = shape
            .clone()
            .try_into()
            .map_err(|e| GridError::container(format!("{:?}", e)))?;

        let written_at = Utc::now();
        let mut attrs = cube.metadata.to_attributes();
        attrs.insert("date".to_string(), serde_json::json!(written_at.to_rfc3339()));

        let array = ArrayBuilder::new(
            shape.clone(),
            DataType::Float64,
            chunk_grid,
            FillValue::from(f64::NAN),
        )
        .attributes(attrs)
        .build(store, "/")
        .map_err(|e| GridError::container(e.to_string()))?;

        array
            .store_metadata()
            .map_err(|e| GridError::container(e.to_string()))?;

        let subset = ArraySubset::new_with_start_shape(vec![0; shape.len()], shape)
            .map_err(|e| GridError::container(e.to_string()))?;
        array
            .store_array_subset_elements(&subset, &cube.data)
            .map_err(|e| GridError::container(e.to_string()))?;

        let bytes_written = (cube.data.len() * std::mem::size_of::<f64>()) as u64;
        info!(
            path = %path.display(),
            shape = ?cube.shape,
            btype = %cube.metadata.btype,
            bytes = bytes_written,
            "Wrote cube"
        );

        Ok(CubeWriteResult {
            path: path.to_path_buf(),
            shape: cube.shape.clone(),
            bytes_written,
            written_at,
        })
    }
}

fn remove_existing(path: &Path) -> Result<()> {
    if path.is_dir() {
        debug!(path = %path.display(), "Removing existing container");
        std::fs::remove_dir_all(path)?;
    } else if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

/// Read a cube written by [`CubeWriter`].
pub fn read_cube(path: impl AsRef<Path>) -> Result<GridCube> {
    let path = path.as_ref();
    let store = FilesystemStore::new(path).map_err(|e| GridError::container(e.to_string()))?;
    let array = Array::open(Arc::new(store), "/")
        .map_err(|e| GridError::container(format!("{}: {}", path.display(), e)))?;

    let shape: Vec<u64> = array.shape().to_vec();
    let subset = ArraySubset::new_with_start_shape(vec![0; shape.len()], shape.clone())
        .map_err(|e| GridError::container(e.to_string()))?;
    let data: Vec<f64> = array
        .retrieve_array_subset_elements(&subset)
        .map_err(|e| GridError::container(e.to_string()))?;

    let metadata = CoordinateMetadata::from_attributes(array.attributes())?;
    GridCube::new(shape.iter().map(|&n| n as usize).collect(), data, metadata)
}
