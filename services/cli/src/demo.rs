use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ad_wizard::config::AppConfig;
use ad_wizard::error::AppError;
use ad_wizard::workflows::ad_submission::{
    AccessDecision, AccessGate, AdWizard, AgeRange, BodyType, DraftPatch, FileSource, MediaFile,
    ModerationStatus, ModerationWatcher, ObjectUrlRegistry, Profile, ProfileLookup,
    RelationshipStatus, Session, SubmissionCallbacks, SubmitError, SubmitOutcome,
    VerificationStatus, VideoSelection, WizardScreen, WizardServices, WizardStep,
};
use clap::Args;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::infra::{
    admin_authority, parse_decision, parse_verification, ChannelModerationFeed, InMemoryAdStore,
    InMemoryUploader, StaticProbe,
};

type DemoWizard = AdWizard<InMemoryUploader, InMemoryAdStore>;

const PROBE_LATENCY: Duration = Duration::from_millis(600);

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Image to attach as the avatar. A synthetic 1.2 MB JPEG is used when omitted.
    #[arg(long)]
    pub(crate) avatar: Option<PathBuf>,
    /// Duration reported by the simulated video probe, in seconds.
    #[arg(long, default_value_t = 45.0)]
    pub(crate) video_seconds: f64,
    /// Skip the video lane.
    #[arg(long)]
    pub(crate) skip_video: bool,
    /// Moderation decision applied once the ad is committed.
    #[arg(long, value_parser = parse_decision, default_value = "approved")]
    pub(crate) decision: ModerationStatus,
    /// Print the final wizard view as JSON.
    #[arg(long)]
    pub(crate) json: bool,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            avatar: None,
            video_seconds: 45.0,
            skip_video: false,
            decision: ModerationStatus::Approved,
            json: false,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct AccessArgs {
    /// Email of the signed-in identity. Omit to evaluate an anonymous visitor.
    #[arg(long)]
    pub(crate) email: Option<String>,
    /// Role claims carried by the session (repeatable).
    #[arg(long = "role")]
    pub(crate) roles: Vec<String>,
    /// Profile verification status.
    #[arg(long, value_parser = parse_verification, default_value = "unverified")]
    pub(crate) verification: VerificationStatus,
    /// Profile has an active premium membership.
    #[arg(long)]
    pub(crate) premium: bool,
    /// Treat the profile fetch as still in flight.
    #[arg(long, conflicts_with = "missing_profile")]
    pub(crate) loading: bool,
    /// Treat the profile as absent.
    #[arg(long)]
    pub(crate) missing_profile: bool,
    /// Print the decision as JSON.
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_access_check(args: AccessArgs, config: &AppConfig) -> Result<(), AppError> {
    let AccessArgs {
        email,
        roles,
        verification,
        premium,
        loading,
        missing_profile,
        json,
    } = args;

    let session = email.map(|email| Session {
        id: Uuid::new_v4().to_string(),
        email,
        is_authenticated: true,
        roles,
    });
    let profile = if loading {
        ProfileLookup::Loading
    } else if missing_profile {
        ProfileLookup::NotFound
    } else {
        ProfileLookup::Ready(Profile {
            verification_status: verification,
            is_premium: premium,
        })
    };

    let gate = AccessGate::new(admin_authority(&config.wizard));
    let decision = gate.evaluate(session.as_ref(), profile);

    if json {
        match serde_json::to_string_pretty(&decision) {
            Ok(payload) => println!("{payload}"),
            Err(err) => println!("Access decision unavailable: {err}"),
        }
    } else {
        render_access(&decision);
    }
    Ok(())
}

fn render_access(decision: &AccessDecision) {
    println!(
        "Access: {}{}",
        if decision.can_access { "granted" } else { "denied" },
        if decision.admin_override {
            " (admin override)"
        } else {
            ""
        }
    );
    if decision.reasons.is_empty() {
        println!("  Outstanding requirements: none");
        return;
    }
    println!("  Outstanding requirements:");
    for reason in &decision.reasons {
        println!("    - {} {}", reason.code(), reason.message());
    }
}

pub(crate) async fn run_demo(args: DemoArgs, config: &AppConfig) -> Result<(), AppError> {
    let wizard_config = config.wizard.clone();
    let user_id = Uuid::new_v4().to_string();
    let session = Session {
        id: user_id.clone(),
        email: "demo@ads.local".to_string(),
        is_authenticated: true,
        roles: Vec::new(),
    };
    let profile = ProfileLookup::Ready(Profile {
        verification_status: VerificationStatus::Verified,
        is_premium: true,
    });

    let feed = ChannelModerationFeed::default();
    let store = Arc::new(InMemoryAdStore::new(&user_id, feed.clone()));
    let uploader = Arc::new(InMemoryUploader::default());
    let previews = Arc::new(ObjectUrlRegistry::default());
    let (signal_tx, mut signal_rx) = mpsc::channel(8);
    let watcher = ModerationWatcher::spawn(&feed, &user_id, signal_tx);
    let (closed_tx, mut closed_rx) = mpsc::unbounded_channel();

    let callbacks = SubmissionCallbacks::default()
        .on_success(|id| info!(ad_id = %id.0, "submission succeeded"))
        .on_failure(|err| info!(error = %err, "submission failed"));
    let gate = AccessGate::new(admin_authority(&wizard_config));
    let mut wizard = AdWizard::open(
        &gate,
        Some(&session),
        profile,
        wizard_config.clone(),
        WizardServices {
            probe: Arc::new(StaticProbe::new(args.video_seconds, PROBE_LATENCY)),
            previews: previews.clone(),
            uploader: uploader.clone(),
            committer: store.clone(),
        },
        callbacks,
    )
    .with_completion(move |id| {
        let _ = closed_tx.send(id.clone());
    });

    println!("Ad wizard demo");
    println!("  Session: {} ({})", session.email, session.id);
    if wizard.screen() != &WizardScreen::Editing {
        render_access(wizard.access());
        return Ok(());
    }

    render_step(&wizard);
    wizard.update_values(DraftPatch {
        title: Some("Sunday market regular".to_string()),
        description: Some("Early riser, coffee snob, always at the flower stall.".to_string()),
        relationship_status: Some(RelationshipStatus::Single),
        looking_for: Some(vec!["Friendship".to_string(), "Dating".to_string()]),
        location: Some("Gothenburg".to_string()),
        ..DraftPatch::default()
    });
    render_progress(&wizard);
    advance(&mut wizard).await;

    wizard.update_values(DraftPatch {
        age_range: Some(AgeRange::new(25, 40).map_err(SubmitError::from)?),
        body_type: Some(BodyType::Athletic),
        tags: Some(vec!["markets".to_string(), "cycling".to_string()]),
        ..DraftPatch::default()
    });
    render_progress(&wizard);
    advance(&mut wizard).await;

    let avatar = match &args.avatar {
        Some(path) => media_file_from_path(path)?,
        None => MediaFile::new("demo-avatar.jpg", "image/jpeg", 1_258_291, FileSource::Picker),
    };
    let avatar_name = avatar.name.clone();
    match wizard.select_avatar(avatar) {
        Ok(()) => println!("  Avatar attached: {avatar_name}"),
        Err(rejection) => println!("  Avatar rejected: {rejection}"),
    }
    if !args.skip_video {
        attach_demo_video(&mut wizard).await;
    }
    render_progress(&wizard);
    advance(&mut wizard).await;

    render_review(&wizard);
    match wizard.submit().await {
        Ok(SubmitOutcome::Committed(id)) => {
            println!("  Committed ad {}", id.0);
            if let Some(stored) = store.get(&id) {
                println!("  Stored listing: {}", stored.draft.title);
                println!(
                    "  Moderation status: {}",
                    stored.moderation.status.label()
                );
                if let Some(url) = &stored.media.avatar_url {
                    println!("  Avatar stored at {url}");
                }
                if let Some(url) = &stored.media.video_url {
                    println!("  Video stored at {url}");
                }
            }
            println!("  Objects uploaded: {}", uploader.objects().len());

            match store.moderate(&id, args.decision) {
                Ok(Some(_)) => {
                    match tokio::time::timeout(Duration::from_secs(1), signal_rx.recv()).await {
                        Ok(Some(signal)) => println!("  Moderation signal: {signal:?}"),
                        _ => println!("  Moderation signal: none"),
                    }
                }
                Ok(None) => println!("  Moderation skipped: ad not found"),
                Err(err) => println!("  Moderation refused: {err}"),
            }

            let wait = wizard_config.close_delay + Duration::from_secs(1);
            match tokio::time::timeout(wait, closed_rx.recv()).await {
                Ok(Some(_)) => println!(
                    "  Wizard closed after {} ms",
                    wizard_config.close_delay.as_millis()
                ),
                _ => println!("  Wizard close timer did not fire"),
            }
        }
        Ok(SubmitOutcome::AlreadyInFlight) => println!("  Submission already in flight"),
        Err(err) => {
            println!("  Submission failed: {err}");
            for error in wizard.validation_errors() {
                println!("    - {:?}: {}", error.field, error.message);
            }
        }
    }

    if args.json {
        match serde_json::to_string_pretty(&wizard.view()) {
            Ok(payload) => println!("\nWizard view:\n{payload}"),
            Err(err) => println!("\nWizard view unavailable: {err}"),
        }
    }

    wizard.close();
    feed.shutdown();
    let forwarded = watcher.finished().await;
    info!(forwarded, live_previews = previews.live().len(), "demo finished");
    Ok(())
}

async fn advance(wizard: &mut DemoWizard) {
    if wizard.next().started() && wizard.settle().await.is_some() {
        render_step(wizard);
    }
}

async fn attach_demo_video(wizard: &mut DemoWizard) {
    let lane = wizard.video_lane();
    let clip = MediaFile::new(
        "demo-clip.mp4",
        "video/mp4",
        24 * 1024 * 1024,
        FileSource::DragDrop,
    );
    let pending = tokio::spawn({
        let lane = lane.clone();
        async move { lane.select(clip).await }
    });

    let mut ticks = tokio::time::interval(Duration::from_millis(200));
    while !pending.is_finished() {
        ticks.tick().await;
        if let Some(progress) = lane.progress() {
            println!("  Video processing: {progress:.0}%");
        }
    }

    match pending.await {
        Ok(Ok(VideoSelection::Ready(video))) => println!(
            "  Video attached: {} ({:.0}s, thumbnail {})",
            video.file.name,
            video.duration_secs,
            video.thumbnail_url.as_deref().unwrap_or("none")
        ),
        Ok(Ok(VideoSelection::Superseded)) => println!("  Video selection superseded"),
        Ok(Err(err)) => println!("  Video rejected: {err}"),
        Err(err) => println!("  Video task failed: {err}"),
    }
    wizard.sync_video();
}

fn media_file_from_path(path: &Path) -> Result<MediaFile, AppError> {
    let metadata = std::fs::metadata(path)?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    Ok(MediaFile::new(
        name,
        mime.essence_str(),
        metadata.len(),
        FileSource::Picker,
    ))
}

fn render_step(wizard: &DemoWizard) {
    let step = wizard.current_step();
    println!(
        "\nStep {}/{}: {}",
        step.index() + 1,
        WizardStep::ordered().len(),
        step.label()
    );
}

fn render_progress(wizard: &DemoWizard) {
    println!("  Completion: {}%", wizard.progress_percent());
    for error in wizard.validation_errors() {
        println!("  Needs attention: {}", error.message);
    }
}

fn render_review(wizard: &DemoWizard) {
    let draft = wizard.draft();
    println!("  Title: {}", draft.title);
    println!("  Location: {}", draft.location);
    println!(
        "  Relationship: {}",
        draft
            .relationship_status
            .map(RelationshipStatus::label)
            .unwrap_or("unspecified")
    );
    println!("  Looking for: {}", draft.looking_for.join(", "));
    println!(
        "  Ages: {}-{}",
        draft.age_range.lower(),
        draft.age_range.upper()
    );
    println!(
        "  Media: avatar {}, video {}",
        if draft.avatar.is_some() { "yes" } else { "no" },
        if draft.video.is_some() { "yes" } else { "no" }
    );
}
