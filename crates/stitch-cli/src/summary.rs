use console::Style;

use stitch_core::pipeline::config::PipelineConfig;

struct Styles {
    title: Style,
    label: Style,
    value: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_pipeline_summary(config: &PipelineConfig) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Tile Stitcher"));
    println!("  {}", s.title.apply_to("\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}"));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Tiles"),
        s.path.apply_to(config.image_dirpath.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(config.output_dirpath.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Grid"),
        s.value.apply_to(format!("{} x {}", config.grid_width, config.grid_height))
    );
    println!();

    println!(
        "    {:<20}{}",
        s.label.apply_to("Overlap uncertainty"),
        s.value.apply_to(format!("{:.1}%", config.overlap_uncertainty))
    );
    println!(
        "    {:<20}{}",
        s.label.apply_to("Valid NCC threshold"),
        s.value.apply_to(config.valid_correlation_threshold)
    );
    if let Some(h) = config.horizontal_overlap {
        println!("    {:<20}{:.1}%", s.label.apply_to("Horizontal overlap"), h);
    }
    if let Some(v) = config.vertical_overlap {
        println!("    {:<20}{:.1}%", s.label.apply_to("Vertical overlap"), v);
    }
    if let Some(r) = config.stage_repeatability {
        println!("    {:<20}{:.1}px", s.label.apply_to("Repeatability"), r);
    }
    println!(
        "    {:<20}{:?}",
        s.label.apply_to("Refinement"),
        config.translation_refinement_method
    );
    println!();

    if config.save_image {
        println!("  {}", s.value.apply_to("A stitched mosaic will be written"));
    } else {
        println!("  {}", s.label.apply_to("No mosaic image will be written (--save-image to enable)"));
    }
    println!();
}
