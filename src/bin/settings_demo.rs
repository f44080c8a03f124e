use sessionward::settings::*;

#[derive(Parser, Debug)]
struct DemoArgs {
    #[arg(long)]
    settings: Option<String>,
}

fn main() {
    // Load settings from the default location
    let project_settings = parse_settings(None).unwrap();
    println!("Loaded settings: {:?}", project_settings);

    // Attempt to load from an invalid path (expected to fail)
    let is_err = parse_settings(Some("")).is_err();
    println!("Error on invalid path: {:?}", is_err);

    // Attempt to load from a custom path
    // $ cargo run --bin settings_demo -- --settings=settings/release.toml
    let args = DemoArgs::parse();
    let project_settings = parse_settings(args.settings.as_deref()).unwrap();
    println!("Loaded settings: {:?}", project_settings);
}
