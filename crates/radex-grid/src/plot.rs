//! 2-D plot slices: cut, interpolate onto the plot mesh, clamp.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::axis::{resolve_axes, RegularMesh};
use crate::cut::{select_cut, CutSpec, ThirdVariable};
use crate::error::{GridError, Result};
use crate::field::Field;
use crate::interpolation::{interpolate_masked, Grid2, Projection};
use crate::report::ConditionReporter;
use crate::table::SampleTable;

/// Quantity shown by a contour plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotType {
    #[default]
    Ratio,
    Tau1,
    Tau2,
    Tex1,
    Tex2,
}

impl PlotType {
    pub const ALL: [PlotType; 5] = [Self::Ratio, Self::Tau1, Self::Tau2, Self::Tex1, Self::Tex2];

    pub fn field(&self) -> Field {
        match self {
            Self::Ratio => Field::Ratio,
            Self::Tau1 => Field::Tau1,
            Self::Tau2 => Field::Tau2,
            Self::Tex1 => Field::Tex1,
            Self::Tex2 => Field::Tex2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.field().name()
    }

    pub fn colorbar_label(&self) -> &'static str {
        match self {
            Self::Ratio => "F_1-1 / F_2-2",
            Self::Tau1 => "tau_1-1",
            Self::Tau2 => "tau_2-2",
            Self::Tex1 => "T_ex(1-1)",
            Self::Tex2 => "T_ex(2-2)",
        }
    }
}

impl FromStr for PlotType {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self> {
        PlotType::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let names: Vec<&str> = PlotType::ALL.iter().map(|p| p.as_str()).collect();
                GridError::unknown_field(s, &names)
            })
    }
}

/// Optional value limits and log scaling applied after interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ClampOptions {
    pub vmin: Option<f64>,
    pub vmax: Option<f64>,
    pub log_scale: bool,
}

/// Apply `options` to `grid` in place.
///
/// Values above `vmax` become `vmax`. Values above `vmin` become `vmin`;
/// existing plots depend on this comparison, so it is kept as is.
pub fn clamp_and_scale(grid: &mut Grid2, options: &ClampOptions) {
    if let Some(vmax) = options.vmax {
        for v in grid.data.iter_mut().filter(|v| **v > vmax) {
            *v = vmax;
        }
    }
    if let Some(vmin) = options.vmin {
        for v in grid.data.iter_mut().filter(|v| **v > vmin) {
            *v = vmin;
        }
    }
    if options.log_scale {
        for v in grid.data.iter_mut() {
            *v = v.log10();
        }
    }
}

/// Titles and file name of one plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotLabels {
    pub x_label: String,
    pub y_label: String,
    pub title: String,
    pub colorbar_label: String,
    /// `{stem}_{plottype}_{transition}`, without extension.
    pub file_stem: String,
}

impl PlotLabels {
    pub fn new(
        variable: ThirdVariable,
        value: f64,
        plot_type: PlotType,
        transition: &str,
    ) -> Self {
        Self {
            x_label: variable.x_label().to_string(),
            y_label: variable.y_label().to_string(),
            title: variable.title(value),
            colorbar_label: plot_type.colorbar_label().to_string(),
            file_stem: format!("{}_{}_{}", variable.stem(value), plot_type.as_str(), transition),
        }
    }
}

/// One contour plot to produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotRequest {
    pub third: ThirdVariable,
    pub cut: CutSpec,
    pub plot_type: PlotType,
    pub clamp: ClampOptions,
    /// Used only in the output file name.
    pub transition: String,
}

impl Default for PlotRequest {
    fn default() -> Self {
        Self {
            third: ThirdVariable::Temperature,
            cut: CutSpec::Value(10.0),
            plot_type: PlotType::Ratio,
            clamp: ClampOptions::default(),
            transition: "noname".to_string(),
        }
    }
}

/// A cut interpolated onto its plot mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotSlice {
    pub mesh: RegularMesh,
    /// `(ny, nx)` grid, row 0 at the lowest y.
    pub grid: Grid2,
    pub cut_value: f64,
    pub plot_type: PlotType,
    pub labels: PlotLabels,
}

/// Select the requested cut and interpolate it onto the plot mesh.
///
/// The mesh has one point per distinct value of each plotted field over the
/// whole table, spread uniformly across its range.
pub fn project_cut(
    table: &SampleTable,
    request: &PlotRequest,
    reporter: &mut ConditionReporter,
) -> Result<PlotSlice> {
    let cut = select_cut(table, request.third, request.cut)?;
    let (x_field, y_field) = request.third.plotted_fields();

    let axes = resolve_axes(table, &[x_field, y_field], None)?;
    let mesh = RegularMesh::from_axes(&axes[0], &axes[1]);
    let projection = Projection {
        x_field,
        y_field,
        value_field: request.plot_type.field(),
        mesh: &mesh,
    };

    let mut grid = interpolate_masked(
        table,
        projection,
        &cut.mask,
        &[(request.third.field(), cut.value)],
        reporter,
    )?;
    clamp_and_scale(&mut grid, &request.clamp);

    let labels = PlotLabels::new(
        request.third,
        cut.value,
        request.plot_type,
        &request.transition,
    );
    info!(
        stem = %labels.file_stem,
        nx = mesh.nx(),
        ny = mesh.ny(),
        nan = grid.nan_count(),
        "Projected cut"
    );

    Ok(PlotSlice {
        mesh,
        grid,
        cut_value: cut.value,
        plot_type: request.plot_type,
        labels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testdata::synthetic_table;

    #[test]
    fn test_clamp_regression() {
        let mut grid = Grid2::new(vec![0.5, 5.0, 50.0], 3, 1);
        clamp_and_scale(
            &mut grid,
            &ClampOptions {
                vmax: Some(10.0),
                ..ClampOptions::default()
            },
        );
        assert_eq!(grid.data, vec![0.5, 5.0, 10.0]);

        clamp_and_scale(
            &mut grid,
            &ClampOptions {
                vmin: Some(1.0),
                ..ClampOptions::default()
            },
        );
        assert_eq!(grid.data, vec![0.5, 1.0, 1.0]);
    }

    #[test]
    fn test_log_scale_tolerates_nonpositive() {
        let mut grid = Grid2::new(vec![100.0, 0.0, -1.0], 3, 1);
        clamp_and_scale(
            &mut grid,
            &ClampOptions {
                log_scale: true,
                ..ClampOptions::default()
            },
        );
        assert_eq!(grid.data[0], 2.0);
        assert_eq!(grid.data[1], f64::NEG_INFINITY);
        assert!(grid.data[2].is_nan());
    }

    #[test]
    fn test_plot_type_parse() {
        assert_eq!("tau2".parse::<PlotType>().unwrap(), PlotType::Tau2);
        assert_eq!("RATIO".parse::<PlotType>().unwrap(), PlotType::Ratio);
        assert!("tline1".parse::<PlotType>().is_err());
    }

    #[test]
    fn test_project_density_cut() {
        let table = synthetic_table(&[10.0, 20.0, 40.0], &[3.0, 4.0], &[12.0, 13.0, 14.0]);
        let request = PlotRequest {
            third: ThirdVariable::Density,
            cut: CutSpec::Index(1),
            plot_type: PlotType::Tex1,
            transition: "303_321".to_string(),
            ..PlotRequest::default()
        };
        let mut reporter = ConditionReporter::new();
        let slice = project_cut(&table, &request, &mut reporter).unwrap();

        assert_eq!(slice.cut_value, 4.0);
        assert_eq!(slice.grid.shape(), (3, 3));
        assert_eq!(slice.mesh.x, vec![10.0, 25.0, 40.0]);
        assert_eq!(slice.labels.file_stem, "TemCol_n=1e4percc_tex1_303_321");
        assert_eq!(slice.grid.nan_count(), 0);

        // tex1 is linear in temperature at fixed density and column
        let expected = 0.5 * 25.0 + 0.37 * 4.0 + 0.013 * 13.0;
        assert!((slice.grid.get(1, 1).unwrap() - expected).abs() < 1e-9);
    }
}
