use super::*;

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["shoerev-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn collect_defaults_to_every_kind_and_table() {
    let cli = Cli::try_parse_from(["shoerev-cli", "collect", "12"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Collect {
            shoe_id: 12,
            ref sources,
            format: OutputFormat::Table,
        }) if sources == DEFAULT_SOURCES
    ));
}

#[test]
fn collect_accepts_sources_and_json() {
    let cli = Cli::try_parse_from([
        "shoerev-cli",
        "collect",
        "3",
        "--sources",
        "social",
        "--format",
        "json",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Collect {
            shoe_id: 3,
            ref sources,
            format: OutputFormat::Json,
        }) if sources == "social"
    ));
}

#[test]
fn collect_requires_shoe_id() {
    assert!(Cli::try_parse_from(["shoerev-cli", "collect"]).is_err());
    assert!(Cli::try_parse_from(["shoerev-cli", "collect", "pegasus"]).is_err());
}

#[test]
fn collect_all_defaults() {
    let cli = Cli::try_parse_from(["shoerev-cli", "collect-all"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::CollectAll {
            limit: 5,
            skip_collected: false,
            ..
        })
    ));
}

#[test]
fn collect_all_with_flags() {
    let cli = Cli::try_parse_from([
        "shoerev-cli",
        "collect-all",
        "--limit",
        "20",
        "--sources",
        "video",
        "--skip-collected",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::CollectAll {
            limit: 20,
            ref sources,
            skip_collected: true,
            ..
        }) if sources == "video"
    ));
}

#[test]
fn parses_sources_command() {
    let cli = Cli::try_parse_from(["shoerev-cli", "sources", "9", "--mentions"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Sources {
            shoe_id: 9,
            mentions: true
        })
    ));
}

#[test]
fn parses_shoes_import_with_path() {
    let cli =
        Cli::try_parse_from(["shoerev-cli", "shoes", "import", "--path", "x/shoes.yaml"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Shoes {
            command: ShoesCommands::Import { path: Some(ref p) }
        }) if p.ends_with("shoes.yaml")
    ));
}

#[test]
fn parses_shoes_list_and_config_and_migrate() {
    let cli = Cli::try_parse_from(["shoerev-cli", "shoes", "list"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Shoes {
            command: ShoesCommands::List { limit: 50 }
        })
    ));

    let cli = Cli::try_parse_from(["shoerev-cli", "config"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Config)));

    let cli = Cli::try_parse_from(["shoerev-cli", "migrate"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Migrate)));
}
