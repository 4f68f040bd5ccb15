use super::*;

#[test]
fn parses_analyze_with_several_domains() {
    let cli = Cli::try_parse_from(["storeprobe", "analyze", "a.example", "b.example", "--json"])
        .expect("expected valid cli args");

    match cli.command {
        Commands::Analyze { domains, json } => {
            assert_eq!(domains, vec!["a.example", "b.example"]);
            assert!(json);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn analyze_requires_a_domain() {
    assert!(Cli::try_parse_from(["storeprobe", "analyze"]).is_err());
}

#[test]
fn parses_classify_command() {
    let cli = Cli::try_parse_from(["storeprobe", "classify", "https://shop.example/"])
        .expect("expected valid cli args");
    assert!(matches!(cli.command, Commands::Classify { ref url } if url == "https://shop.example/"));
}

#[test]
fn parses_kb_subcommands() {
    let cli = Cli::try_parse_from(["storeprobe", "kb", "show", "shop.example"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Kb { command: KbCommands::Show { ref domain } } if domain == "shop.example"
    ));

    let cli = Cli::try_parse_from(["storeprobe", "kb", "list"]).unwrap();
    assert!(matches!(cli.command, Commands::Kb { command: KbCommands::List }));

    let cli = Cli::try_parse_from(["storeprobe", "kb", "reset", "shop.example"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Kb { command: KbCommands::Reset { .. } }
    ));
}

#[test]
fn parses_catalog_command() {
    let cli = Cli::try_parse_from(["storeprobe", "catalog"]).unwrap();
    assert!(matches!(cli.command, Commands::Catalog));
}

#[test]
fn missing_command_is_rejected() {
    assert!(Cli::try_parse_from(["storeprobe"]).is_err());
}
