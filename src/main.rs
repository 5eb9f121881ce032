fn main() {
    #[cfg(feature = "cli")]
    oxicompare::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("oxicompare: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
