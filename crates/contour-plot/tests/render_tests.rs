//! End-to-end rendering of projected cuts.

use contour_plot::png::PNG_SIGNATURE;
use contour_plot::{rasterize, render_slice, write_plot, LevelScale, RenderOptions};
use radex_grid::testdata::synthetic_table;
use radex_grid::{
    project_cut, ConditionReporter, CutSpec, Grid2, PlotLabels, PlotSlice, PlotType,
    PlotRequest, RegularMesh, ThirdVariable,
};

fn ihdr_dimensions(png: &[u8]) -> (u32, u32) {
    let w = u32::from_be_bytes([png[16], png[17], png[18], png[19]]);
    let h = u32::from_be_bytes([png[20], png[21], png[22], png[23]]);
    (w, h)
}

fn small_slice(data: Vec<f64>) -> PlotSlice {
    PlotSlice {
        mesh: RegularMesh::new(vec![3.0, 4.0], vec![12.0, 13.0]),
        grid: Grid2::new(data, 2, 2),
        cut_value: 20.0,
        plot_type: PlotType::Ratio,
        labels: PlotLabels::new(ThirdVariable::Temperature, 20.0, PlotType::Ratio, "h2co_30"),
    }
}

#[test]
fn test_render_projected_cut_dimensions() {
    let table = synthetic_table(&[10.0, 20.0], &[3.0, 4.0, 5.0], &[12.0, 13.0]);
    let request = PlotRequest {
        third: ThirdVariable::Temperature,
        cut: CutSpec::Index(0),
        plot_type: PlotType::Tex1,
        ..PlotRequest::default()
    };
    let mut reporter = ConditionReporter::new();
    let slice = project_cut(&table, &request, &mut reporter).unwrap();

    let options = RenderOptions {
        pixel_scale: 4,
        scale: LevelScale::Linear,
        ..RenderOptions::default()
    };
    let rendered = render_slice(&slice, &options).unwrap();
    assert_eq!(&rendered.png[0..8], &PNG_SIGNATURE);
    assert_eq!((rendered.width, rendered.height), (12, 8));
    assert_eq!(ihdr_dimensions(&rendered.png), (12, 8));
    assert_eq!(rendered.levels.band_count(), 49);
}

#[test]
fn test_nan_and_below_range_cells_render_transparent() {
    let slice = small_slice(vec![f64::NAN, 0.5, 1e-5, 0.5]);
    let options = RenderOptions {
        pixel_scale: 1,
        ..RenderOptions::default()
    };
    let rendered = render_slice(&slice, &options).unwrap();
    assert_eq!(ihdr_dimensions(&rendered.png), (2, 2));
    assert_eq!(rendered.levels.scale(), LevelScale::Log);

    let colors = options.colormap.band_colors(rendered.levels.band_count());
    let (pixels, _, _) = rasterize(&slice.grid, &rendered.levels, &colors, 1).unwrap();
    let alpha: Vec<u8> = pixels.chunks_exact(4).map(|px| px[3]).collect();
    // Image rows are top-down: grid row 1 first, then grid row 0
    assert_eq!(alpha, vec![0, 255, 0, 255]);
}

#[test]
fn test_write_plot_files() {
    let dir = tempfile::tempdir().unwrap();
    let slice = small_slice(vec![0.01, 0.1, 1.0, 5.0]);
    let written = write_plot(dir.path(), &slice, &RenderOptions::default()).unwrap();

    assert_eq!(
        written.image.file_name().unwrap().to_str().unwrap(),
        "DenCol_T=20K_ratio_h2co_30.png"
    );
    let png = std::fs::read(&written.image).unwrap();
    assert_eq!(&png[0..8], &PNG_SIGNATURE);
    assert_eq!(ihdr_dimensions(&png), (16, 16));

    let sidecar: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&written.sidecar).unwrap()).unwrap();
    assert_eq!(sidecar["labels"]["title"], "T = 20 K");
    assert_eq!(sidecar["labels"]["colorbar_label"], "F_1-1 / F_2-2");
    assert_eq!(sidecar["scale"], "log");
    assert_eq!(sidecar["levels"].as_array().unwrap().len(), 50);
}
