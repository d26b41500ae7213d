mod cli;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("--cli") => {
            env_logger::Builder::from_default_env()
                .filter_level(log::LevelFilter::Debug)
                .init();
            cli::run_scripted_session()
        }
        Some(path) => {
            env_logger::Builder::from_default_env()
                .filter_level(log::LevelFilter::Info)
                .init();
            cli::play_file(path)
        }
        None => {
            eprintln!("usage: {} --cli | <file.wav>", args[0]);
            Ok(())
        }
    }
}
