use clap::{Args, Parser, Subcommand};
use lottery_core::{EventId, UserId};

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Opts {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub cmd: OptsCmd,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Path to the redb database file.
    #[arg(long, env = "LOTTERY_DB_PATH", default_value = "lottery.redb")]
    pub db_path: std::path::PathBuf,
}

#[derive(Debug, Subcommand)]
pub enum OptsCmd {
    /// Print a freshly generated opaque user ID, for seeding test profiles.
    GenUserId,

    #[command(subcommand)]
    Event(EventCmd),
    #[command(subcommand)]
    Profile(ProfileCmd),
    #[command(subcommand)]
    Waiting(WaitingCmd),
    #[command(subcommand)]
    Draw(DrawCmd),
    #[command(subcommand)]
    Response(ResponseCmd),
    #[command(subcommand)]
    Broadcast(BroadcastCmd),

    /// Cascade-delete a profile from every roster it belongs to.
    DeleteProfile { user_id: UserId },
    /// Cascade-delete an organizer: their events, then their profile.
    DeleteOrganizer { organizer_id: UserId },
    /// Aggregate one user's membership across every roster.
    Dashboard { user_id: UserId },
}

#[derive(Debug, Subcommand)]
pub enum EventCmd {
    Create {
        organizer_id: UserId,
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long, default_value = "general")]
        event_type: String,
        #[arg(long)]
        registration_start: u64,
        #[arg(long)]
        registration_end: u64,
        /// Repeatable; defaults to a single occurrence at `registration_end`.
        #[arg(long = "occurrence")]
        occurrences: Vec<u64>,
        #[arg(long)]
        capacity: std::num::NonZeroU32,
        #[arg(long)]
        waiting_list_cap: Option<u32>,
        #[arg(long)]
        publish: bool,
    },
    Publish {
        event_id: EventId,
    },
    Cancel {
        event_id: EventId,
    },
    Get {
        event_id: EventId,
    },
    List {
        #[arg(long)]
        organizer_id: Option<UserId>,
        #[arg(long)]
        for_entrant_as_of: Option<u64>,
    },
    Delete {
        event_id: EventId,
    },
}

#[derive(Debug, Subcommand)]
pub enum ProfileCmd {
    Create { user_id: UserId, display_name: String },
    Get { user_id: UserId },
    SetPushToken { user_id: UserId, push_token: String },
    SetNotificationEnabled { user_id: UserId, enabled: bool },
}

#[derive(Debug, Subcommand)]
pub enum WaitingCmd {
    Join {
        event_id: EventId,
        user_id: UserId,
        #[arg(long)]
        now: u64,
        #[arg(long, requires = "longitude")]
        latitude: Option<f64>,
        #[arg(long, requires = "latitude")]
        longitude: Option<f64>,
    },
    Leave {
        event_id: EventId,
        user_id: UserId,
    },
    List {
        event_id: EventId,
    },
}

#[derive(Debug, Subcommand)]
pub enum DrawCmd {
    Initial {
        event_id: EventId,
        #[arg(long)]
        winners: usize,
        #[arg(long)]
        now: u64,
        #[arg(long)]
        seed: Option<u64>,
    },
    Replacement {
        event_id: EventId,
        #[arg(long)]
        count: usize,
        #[arg(long)]
        now: u64,
        #[arg(long)]
        seed: Option<u64>,
    },
    Candidates {
        event_id: EventId,
    },
}

#[derive(Debug, Subcommand)]
pub enum ResponseCmd {
    Accept { event_id: EventId, user_id: UserId, #[arg(long)] now: u64 },
    Decline { event_id: EventId, user_id: UserId, #[arg(long)] now: u64 },
    OrganizerCancel { event_id: EventId, user_id: UserId, #[arg(long)] now: u64 },
    /// Run the deadline sweep once, moving every expired `responsePending`
    /// membership to `cancelled(EXPIRED)`.
    Sweep { #[arg(long)] now: u64 },
}

#[derive(Debug, Subcommand)]
pub enum BroadcastCmd {
    ToRoster {
        event_id: EventId,
        #[arg(value_enum)]
        roster: RosterArg,
        sender_id: UserId,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum RosterArg {
    Waiting,
    ResponsePending,
    InEvent,
    Cancelled,
}
