use console::Style;
use leap_prep_core::output::OutputFormat;
use leap_prep_core::pipeline::config::PrepConfig;
use leap_prep_core::pipeline::PrepOutput;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    method: Style,
    disabled: Style,
    path: Style,
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
        }
    }
}

pub fn print_prep_summary(config: &PrepConfig) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("LEAP Video Prep"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(15)));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Input"),
        s.path.apply_to(config.input.display())
    );
    println!(
        "  {:<14}{} {}",
        s.label.apply_to("Output"),
        s.path.apply_to(config.output.display()),
        s.label.apply_to(format!("({})", OutputFormat::from_path(&config.output)))
    );
    match config.frame_range {
        Some(range) => println!(
            "  {:<14}{}",
            s.label.apply_to("Frames"),
            s.value.apply_to(format!("{} +{}", range.start, range.count))
        ),
        None => println!(
            "  {:<14}{}",
            s.label.apply_to("Frames"),
            s.value.apply_to("all")
        ),
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("Memory"),
        s.method.apply_to(config.memory)
    );
    println!();

    println!("  {}", s.header.apply_to("Background"));
    if config.remove_bkg {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Method"),
            s.method.apply_to(config.bkg_method)
        );
        println!(
            "    {:<12}{}",
            s.label.apply_to("Every"),
            s.value.apply_to(format!("{} frames", config.bkg_sep))
        );
        if !config.legacy_scale {
            println!(
                "    {:<12}{}",
                s.label.apply_to("Scale"),
                s.disabled.apply_to("direct ratio")
            );
        }
    } else {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Method"),
            s.disabled.apply_to("disabled (input pre-normalized)")
        );
    }
    println!();

    println!("  {}", s.header.apply_to("Contrast"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Invert"),
        s.value.apply_to(if config.invert { "yes" } else { "no" })
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Cutoff"),
        s.value.apply_to(config.cutoff)
    );
    println!();
}

pub fn print_result(output: &PrepOutput) {
    let s = Styles::new();
    let (h, w) = output.dimensions;

    println!();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Frames"),
        s.value.apply_to(format!(
            "{}..{} of {}",
            output.range.start,
            output.range.end(),
            output.total_frames
        ))
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Shape"),
        s.value.apply_to(format!("({}, {}, {}, 1)", output.range.count, h, w))
    );
    if let Some(mean) = output.background_mean {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Bkg mean"),
            s.value.apply_to(format!("{mean:.2}"))
        );
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("Saved to"),
        s.path.apply_to(output.output.display())
    );
    println!();
}
