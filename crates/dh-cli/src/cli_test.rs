use super::*;
use clap::CommandFactory;

#[test]
fn verify_cli_args() {
    // Validates the entire command tree: short flag conflicts,
    // duplicate args, and other clap definition errors.
    Cli::command().debug_assert();
}

#[test]
fn test_parse_deploy_with_globals() {
    let cli = Cli::try_parse_from(["dh", "deploy", "--parallel", "-y", "-c", "ops/deckhand.yml"])
        .unwrap();
    assert!(cli.global.yes);
    assert_eq!(cli.global.config.as_deref(), Some("ops/deckhand.yml"));
    assert_eq!(cli.global.project_dir, ".");
    match cli.command {
        Commands::Deploy(args) => assert!(args.parallel),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn test_parse_cleanup_keep() {
    let cli = Cli::try_parse_from(["dh", "-v", "cleanup", "--keep", "3"]).unwrap();
    assert!(cli.global.verbose);
    match cli.command {
        Commands::Cleanup(args) => assert_eq!(args.keep, Some(3)),
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn test_unknown_verb_is_rejected() {
    let err = Cli::try_parse_from(["dh", "release"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::InvalidSubcommand);
    assert_ne!(err.exit_code(), 0);
}

#[test]
fn test_missing_verb_is_rejected() {
    assert!(Cli::try_parse_from(["dh"]).is_err());
}
