//! switchboard-console: drive a controller from the command line.
//!
//! ```text
//! switchboard-console get-preview-ports
//! switchboard-console set-composite-mode preview
//! switchboard-console switch video-B 3004
//! switchboard-console adjust-pip -- -10 0 0 0
//! switchboard-console mark-face 10,20,64,64 200,40,48,48
//! switchboard-console watch --json
//! switchboard-console schema
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use switchboard_core::protocol::{EVENTS, METHODS};
use switchboard_core::{
    Channel, ClientEvent, ClientOptions, ClientRole, CompositeMode, DEFAULT_ADDRESS, Endpoint,
    FaceBox, SwitchClient, SwitchError,
};

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "switchboard-console", about = "Switchboard operator console")]
struct Cli {
    /// Controller endpoint.
    #[arg(short, long, default_value = DEFAULT_ADDRESS)]
    address: String,

    /// Reply timeout in milliseconds.
    #[arg(long, default_value_t = 5000)]
    timeout_ms: u64,

    #[arg(long, value_enum, default_value_t = RoleArg::Ui)]
    role: RoleArg,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RoleArg {
    None,
    Ui,
    Capture,
}

impl From<RoleArg> for ClientRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::None => ClientRole::None,
            RoleArg::Ui => ClientRole::Ui,
            RoleArg::Capture => ClientRole::Capture,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the composite output port.
    GetComposePort,
    /// Print the encode output port.
    GetEncodePort,
    /// Print the active audio port.
    GetAudioPort,
    /// List preview ports as `port serve case`.
    GetPreviewPorts,
    /// Change layout: none, pip, preview (dual_preview), equal (dual_equal) or 0..=3.
    SetCompositeMode { mode: CompositeMode },
    GetCompositeMode,
    /// Start a new recording segment.
    NewRecord,
    /// Nudge the PIP rectangle. Put `--` before negative values.
    AdjustPip {
        dx: i32,
        dy: i32,
        dw: i32,
        dh: i32,
    },
    /// Switch a channel (video-A, video-B, audio) to a source port.
    Switch { channel: Channel, port: i32 },
    /// Forward a click at (x, y) inside a view of the given size.
    ClickVideo {
        x: i32,
        y: i32,
        view_w: i32,
        view_h: i32,
    },
    /// Push face boxes given as `x,y,w,h`.
    MarkFace {
        /// Send as tracking boxes instead.
        #[arg(long)]
        tracking: bool,
        #[arg(value_parser = parse_face_box)]
        faces: Vec<FaceBox>,
    },
    /// Print events as they arrive.
    Watch {
        /// One JSON object per line.
        #[arg(long)]
        json: bool,
        /// Stop after this many events.
        #[arg(long)]
        count: Option<usize>,
    },
    /// Print method and event signatures.
    Schema,
}

fn parse_face_box(s: &str) -> Result<FaceBox, SwitchError> {
    let fields: Vec<i32> = s
        .split(',')
        .map(|n| n.trim().parse::<i32>())
        .collect::<Result<_, _>>()
        .map_err(|_| SwitchError::InvalidCommand(format!("bad face box '{s}'")))?;
    match fields[..] {
        [x, y, w, h] => Ok(FaceBox::new(x, y, w, h)),
        _ => Err(SwitchError::InvalidCommand(format!(
            "face box '{s}' needs four values"
        ))),
    }
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Command::Schema = cli.command {
        print_schema();
        return Ok(());
    }

    let endpoint: Endpoint = cli.address.parse()?;
    let options = ClientOptions::default()
        .with_role(cli.role.into())
        .with_call_timeout(std::time::Duration::from_millis(cli.timeout_ms));
    let client = SwitchClient::new(options);
    debug!(%endpoint, role = %client.role(), "connecting");
    client.connect(&endpoint).await?;

    run(&client, cli.command).await?;

    client.disconnect().await?;
    Ok(())
}

async fn run(client: &SwitchClient, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::GetComposePort => println!("{}", client.get_compose_port().await),
        Command::GetEncodePort => println!("{}", client.get_encode_port().await),
        Command::GetAudioPort => println!("{}", client.get_audio_port().await),
        Command::GetPreviewPorts => {
            for port in client.get_preview_ports().await {
                println!("{} {} {}", port.port, port.serve, port.case);
            }
        }
        Command::SetCompositeMode { mode } => {
            println!("{}", client.set_composite_mode(mode as i32).await);
        }
        Command::GetCompositeMode => {
            let mode = client.get_composite_mode().await;
            match CompositeMode::try_from(mode) {
                Ok(named) => println!("{mode} ({named})"),
                Err(_) => println!("{mode}"),
            }
        }
        Command::NewRecord => println!("{}", client.new_record().await),
        Command::AdjustPip { dx, dy, dw, dh } => {
            let changed = client.adjust_pip(dx, dy, dw, dh).await;
            println!("{:#06b} {changed:?}", changed.bits());
        }
        Command::Switch { channel, port } => {
            println!("{}", client.switch_channel(channel, port).await);
        }
        Command::ClickVideo {
            x,
            y,
            view_w,
            view_h,
        } => println!("{}", client.click_video(x, y, view_w, view_h).await),
        Command::MarkFace { tracking, faces } => {
            if tracking {
                client.mark_tracking(&faces).await;
            } else {
                client.mark_face(&faces).await;
            }
        }
        Command::Watch { json, count } => watch(client, json, count).await?,
        Command::Schema => print_schema(),
    }
    Ok(())
}

async fn watch(
    client: &SwitchClient,
    json: bool,
    count: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut events = client.subscribe();
    let mut seen = 0;

    while count.is_none_or(|limit| seen < limit) {
        let event = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            received = events.recv() => match received {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    eprintln!("skipped {skipped} events");
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
        };

        match event {
            ClientEvent::Controller(event) if json => {
                println!("{}", serde_json::to_string(&event)?);
            }
            ClientEvent::Controller(event) => println!("{event:?}"),
            ClientEvent::ConnectionClosed => {
                eprintln!("controller closed the connection");
                return Ok(());
            }
        }
        seen += 1;
    }
    Ok(())
}

fn print_schema() {
    println!("methods:");
    for entry in METHODS {
        println!("  {:<20} ({}) -> ({})", entry.name, entry.input, entry.output);
    }
    println!("events:");
    for entry in EVENTS {
        println!("  {:<20} ({})", entry.name, entry.args);
    }
}
