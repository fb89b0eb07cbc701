use console::Style;
use lumina_core::display::StatsReport;
use lumina_core::pipeline::config::PipelineConfig;
use lumina_core::pipeline::ProcessedFrame;
use lumina_core::window::RangeWindow;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
    warning: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            method: Style::new().green(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
            warning: Style::new().yellow(),
        }
    }
}

fn bound(v: Option<usize>) -> String {
    v.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn window_text(w: &RangeWindow) -> String {
    format!("x {}..{}  y {}..{}", bound(w.x1), bound(w.x2), bound(w.y1), bound(w.y2))
}

pub fn print_config_summary(config: &PipelineConfig, sources: &[String]) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Lumina Live View"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(16)));
    println!();

    for source in sources {
        println!("  {:<14}{}", s.label.apply_to("Source"), s.path.apply_to(source));
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("Refresh"),
        s.value.apply_to(format!("{} s", config.refresh_rate))
    );
    println!("  {:<14}{}", s.label.apply_to("Float type"), s.value.apply_to(config.float_type));
    println!();

    // Range window
    if config.range.enabled {
        println!("  {}", s.header.apply_to("Range"));
        println!(
            "    {:<12}{}",
            s.label.apply_to("Window"),
            s.value.apply_to(window_text(&config.range.window))
        );
        println!(
            "    {:<12}{}",
            s.label.apply_to("Factor"),
            s.value.apply_to(config.range.factor)
        );
        println!(
            "    {:<12}{}",
            s.label.apply_to("Reduction"),
            s.method.apply_to(config.range.reduction)
        );
    } else {
        println!("  {:<14}{}", s.header.apply_to("Range"), s.disabled.apply_to("full frame"));
    }
    println!();

    println!("  {}", s.header.apply_to("Channels"));
    println!("    {:<12}{}", s.label.apply_to("Mode"), s.method.apply_to(&config.channels.mode));
    println!(
        "    {:<12}{:?}",
        s.label.apply_to("RGB"),
        config.channels.rgb
    );
    println!();

    let switch = |on: bool| if on { s.method.apply_to("on") } else { s.disabled.apply_to("off") };
    println!("  {}", s.header.apply_to("Corrections"));
    println!("    {:<12}{}", s.label.apply_to("Background"), switch(config.background.apply));
    println!("    {:<12}{}", s.label.apply_to("Mask"), switch(config.mask.apply));
    if let Some(threshold) = config.mask.high_value {
        println!(
            "    {:<12}{}",
            s.label.apply_to("High value"),
            s.value.apply_to(threshold)
        );
    }
    println!();

    println!("  {}", s.header.apply_to("Display"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Transform"),
        s.method.apply_to(config.display.transform)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Scaling"),
        s.method.apply_to(config.display.scaling)
    );
    println!();

    if config.filters.is_empty() || !config.filters_enabled {
        println!("  {:<14}{}", s.header.apply_to("Filters"), s.disabled.apply_to("none"));
    } else {
        println!("  {}", s.header.apply_to("Filters"));
        for (i, filter) in config.filters.iter().enumerate() {
            println!("    {}. {}", s.label.apply_to(i + 1), s.value.apply_to(filter));
        }
    }
    println!();
}

pub fn print_frame_summary(name: Option<&str>, processed: &ProcessedFrame, report: &StatsReport) {
    let s = Styles::new();

    println!("  {}", s.header.apply_to(name.unwrap_or("(unnamed frame)")));
    if let Some(display) = &processed.display {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Shape"),
            s.value.apply_to(format!("{:?}{}", display.shape(), if processed.rgb { " rgb" } else { "" }))
        );
    }
    println!(
        "    {:<12}{}",
        s.label.apply_to("Origin"),
        s.value.apply_to(format!("{:?} scale {:?}", processed.range.origin, processed.range.scale))
    );
    println!("    {:<12}{}", s.label.apply_to("Max"), s.value.apply_to(&report.max));
    println!("    {:<12}{}", s.label.apply_to("Mean"), s.value.apply_to(&report.mean));
    println!("    {:<12}{}", s.label.apply_to("Variance"), s.value.apply_to(&report.variance));
    println!("    {:<12}{}", s.label.apply_to("Min"), s.value.apply_to(&report.min));
    println!("    {:<12}{}", s.label.apply_to("Raw max"), s.value.apply_to(&report.max_raw));
    println!("    {:<12}{}", s.label.apply_to("Scaling"), s.method.apply_to(&report.scaling));
    for warning in &processed.warnings {
        println!("    {}", s.warning.apply_to(warning));
    }
    println!();
}
