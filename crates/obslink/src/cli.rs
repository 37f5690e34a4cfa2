//! Argument definitions.

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "obslink", version, about = "Remote-control bridge for OBS Studio")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Hostname or IP of the machine running OBS.
    #[arg(long, global = true, default_value = "localhost")]
    pub host: String,

    /// Websocket port (defaults to 4455 for v5, 4444 for v4).
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Websocket password.
    #[arg(long, global = true, env = "OBS_WS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Which obs-websocket generation the remote speaks.
    #[arg(long, global = true, value_enum, default_value_t = Protocol::V5)]
    pub protocol: Protocol,

    /// How long to wait for the connection before giving up (seconds).
    #[arg(long, global = true, default_value_t = 10)]
    pub timeout: u64,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Protocol {
    /// obs-websocket 4.x (legacy standalone plugin).
    V4,
    /// obs-websocket 5.x (bundled with OBS 28+).
    V5,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scene queries and switching.
    #[command(subcommand)]
    Scene(SceneCommand),

    /// Scene collection queries and switching.
    #[command(subcommand)]
    Collection(CollectionCommand),

    /// Source enumeration and visibility.
    #[command(subcommand)]
    Source(SourceCommand),

    /// Source filter state.
    #[command(subcommand)]
    Filter(FilterCommand),

    /// Audio mute control.
    #[command(subcommand)]
    Mute(MuteCommand),

    /// Stream output control.
    #[command(subcommand)]
    Stream(StreamCommand),

    /// Virtual camera control.
    #[command(subcommand)]
    Virtualcam(VirtualcamCommand),

    /// Follow relayed remote events until interrupted.
    Events,
}

#[derive(Debug, Subcommand)]
pub enum SceneCommand {
    /// List scenes in the remote's declared order.
    List,
    /// Print the current program scene.
    Current,
    /// Switch the current program scene.
    Set { name: String },
}

#[derive(Debug, Subcommand)]
pub enum CollectionCommand {
    List,
    Current,
    Set { name: String },
}

#[derive(Debug, Subcommand)]
pub enum SourceCommand {
    /// List all sources with their filters (scenes included).
    List,
    /// Print the scene → sources map as JSON.
    Data,
    /// List sources that respond to the audio probe.
    Audio,
    /// Read a source's visibility.
    Visibility {
        #[command(flatten)]
        target: SourceTarget,
    },
    /// Write a source's visibility.
    Show {
        #[command(flatten)]
        target: SourceTarget,
    },
    Hide {
        #[command(flatten)]
        target: SourceTarget,
    },
    /// Invert a source's visibility (skipped when unreadable).
    Toggle {
        #[command(flatten)]
        target: SourceTarget,
    },
}

/// One source, addressed per the active protocol: a bare name on v5, a
/// scene plus numeric item id on v4.
#[derive(Debug, Args)]
pub struct SourceTarget {
    /// Source name (v5 addressing).
    #[arg(required_unless_present = "item_id", conflicts_with_all = ["scene", "item_id"])]
    pub name: Option<String>,

    /// Owning scene (v4 addressing, with --item-id).
    #[arg(long, requires = "item_id")]
    pub scene: Option<String>,

    /// Numeric scene-item id (v4 addressing, with --scene).
    #[arg(long, requires = "scene")]
    pub item_id: Option<i64>,
}

#[derive(Debug, Subcommand)]
pub enum FilterCommand {
    /// List a source's filters.
    List { source: String },
    /// Read one filter's enabled state.
    Get { source: String, filter: String },
    Enable { source: String, filter: String },
    Disable { source: String, filter: String },
    /// Invert a filter (skipped when unreadable).
    Toggle { source: String, filter: String },
}

#[derive(Debug, Subcommand)]
pub enum MuteCommand {
    Toggle { source: String },
    On { source: String },
    Off { source: String },
}

#[derive(Debug, Subcommand)]
pub enum StreamCommand {
    Status,
    Start,
    Stop,
}

#[derive(Debug, Subcommand)]
pub enum VirtualcamCommand {
    Start,
    Stop,
}
