use clap::Parser;

use litert_harness::config::HarnessConfig;
use litert_harness::mock::MockRuntime;
use litert_harness::session::InferenceSession;
use litert_harness::ui::routes::run_server;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Local demo harness for in-browser LiteRT inference", long_about = None)]
struct CliArgs {
    /// Optional JSON config file; flags below override its values.
    #[clap(long, value_parser)]
    config: Option<String>,
    #[clap(long, value_parser)]
    host: Option<String>,
    #[clap(long, value_parser)]
    port: Option<u16>,
    /// Directory the runtime support files are served from.
    #[clap(long, value_parser)]
    wasm_dir: Option<String>,
}

fn resolve_config(args: &CliArgs) -> Result<HarnessConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(wasm_dir) = &args.wasm_dir {
        config.wasm_dir = wasm_dir.clone();
    }
    Ok(config)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let args = CliArgs::parse();

    let config = match resolve_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            let mut current_err: Option<&(dyn std::error::Error + 'static)> = e.source();
            while let Some(source) = current_err {
                eprintln!("Caused by: {}", source);
                current_err = source.source();
            }
            std::process::exit(1);
        }
    };

    // The server-side session runs against the bundled deterministic runtime;
    // the real wasm runtime executes in the browser against the files served
    // from /wasm/.
    let mut session = InferenceSession::new(Box::new(MockRuntime::demo()));
    if let Err(e) = session.initialize() {
        eprintln!("Failed to initialize inference runtime: {}", e);
        std::process::exit(1);
    }

    run_server(config, session).await
}
