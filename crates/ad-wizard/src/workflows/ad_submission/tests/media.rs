use std::time::Duration;

use super::common::*;
use crate::workflows::ad_submission::{
    FileSource, LaneError, MediaFile, MediaRejected, ProbeError, VideoLaneState, VideoMedia,
    VideoSelection,
};

const SLOW: Duration = Duration::from_secs(2);

fn ready(selection: Result<VideoSelection, LaneError>) -> VideoMedia {
    match selection {
        Ok(VideoSelection::Ready(media)) => media,
        other => panic!("expected ready video, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn video_longer_than_limit_is_rejected_and_lane_resets() {
    let probe = FakeProbe::default().with("long.mp4", ProbeScript::lasting(150.0));
    let (lane, _, registry) = video_lane(probe);

    let result = lane.select(mp4("long.mp4", 20 * MIB)).await;

    match result {
        Err(LaneError::Rejected(MediaRejected::TooLong { duration_secs, .. })) => {
            assert_eq!(duration_secs, 150.0)
        }
        other => panic!("expected too long, got {other:?}"),
    }
    match lane.state() {
        VideoLaneState::Failed(message) => assert!(message.contains("too long")),
        other => panic!("expected failed state, got {other:?}"),
    }
    assert!(lane.attached().is_none());
    assert_eq!(lane.progress(), None);
    assert!(!lane.has_active_ticker());
    assert!(registry.live().is_empty());
}

#[tokio::test(start_paused = true)]
async fn exactly_the_duration_limit_is_accepted() {
    let probe = FakeProbe::default().with("edge.mp4", ProbeScript::lasting(120.0));
    let (lane, _, registry) = video_lane(probe);

    let media = ready(lane.select(mp4("edge.mp4", 20 * MIB)).await);

    assert_eq!(media.duration_secs, 120.0);
    assert_eq!(media.thumbnail_url.as_deref(), Some("thumb-0"));
    assert_eq!(lane.state(), VideoLaneState::Ready);
    assert_eq!(lane.progress(), Some(100.0));
    assert!(!lane.has_active_ticker());
    assert!(registry.is_live(&media.preview_url));
}

#[tokio::test(start_paused = true)]
async fn type_is_checked_before_size_and_skips_probes() {
    let (lane, probe, _) = video_lane(FakeProbe::default());
    let pdf = MediaFile::new("doc.pdf", "application/pdf", 500 * MIB, FileSource::Picker);

    match lane.select(pdf).await {
        Err(LaneError::Rejected(rejection)) => {
            assert!(rejection.to_string().contains("invalid file type"))
        }
        other => panic!("expected invalid type, got {other:?}"),
    }

    match lane.select(mp4("huge.mp4", 101 * MIB)).await {
        Err(LaneError::Rejected(MediaRejected::TooLarge { limit_mb, .. })) => {
            assert_eq!(limit_mb, 100)
        }
        other => panic!("expected too large, got {other:?}"),
    }
    assert_eq!(probe.decode_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn undecodable_and_unreadable_videos_are_invalid_format() {
    let probe = FakeProbe::default()
        .with(
            "corrupt.mp4",
            ProbeScript {
                decodable: Ok(false),
                ..ProbeScript::default()
            },
        )
        .with(
            "broken.mp4",
            ProbeScript {
                duration: Err(ProbeError::Unreadable("no moov atom".to_string())),
                ..ProbeScript::default()
            },
        )
        .with("nan.mp4", ProbeScript::lasting(f64::NAN));
    let (lane, _, _) = video_lane(probe);

    for name in ["corrupt.mp4", "broken.mp4", "nan.mp4"] {
        assert_eq!(
            lane.select(mp4(name, MIB)).await,
            Err(LaneError::Rejected(MediaRejected::InvalidFormat)),
            "{name}"
        );
        assert!(lane.attached().is_none());
    }
}

#[tokio::test(start_paused = true)]
async fn thumbnail_failure_still_attaches_video() {
    let probe = FakeProbe::default().with(
        "plain.mp4",
        ProbeScript {
            thumbnails: Err(ProbeError::Unavailable("extractor offline".to_string())),
            ..ProbeScript::default()
        },
    );
    let (lane, _, _) = video_lane(probe);

    let media = ready(lane.select(mp4("plain.mp4", MIB)).await);

    assert_eq!(media.thumbnail_url, None);
    assert!(lane.thumbnails().is_empty());
}

#[tokio::test(start_paused = true)]
async fn selection_is_ignored_while_busy() {
    let probe = FakeProbe::default().with("slow.mp4", ProbeScript::default().delayed(SLOW));
    let (lane, _, _) = video_lane(probe);

    let first = tokio::spawn({
        let lane = lane.clone();
        async move { lane.select(mp4("slow.mp4", MIB)).await }
    });
    tokio::task::yield_now().await;

    assert_eq!(lane.state(), VideoLaneState::Processing);
    assert!(lane.has_active_ticker());
    assert_eq!(lane.select(mp4("other.mp4", MIB)).await, Err(LaneError::Busy));

    let media = ready(first.await.expect("join"));
    assert_eq!(media.file.name, "slow.mp4");
}

#[tokio::test(start_paused = true)]
async fn progress_climbs_while_processing_and_holds_below_ceiling() {
    let script = ProbeScript::default().delayed(Duration::from_secs(60));
    let (lane, _, _) = video_lane(FakeProbe::default().with("slow.mp4", script));

    let pending = tokio::spawn({
        let lane = lane.clone();
        async move { lane.select(mp4("slow.mp4", MIB)).await }
    });
    tokio::task::yield_now().await;
    assert_eq!(lane.progress(), Some(0.0));

    tokio::time::sleep(Duration::from_secs(1)).await;
    let early = lane.progress().expect("progress shown");
    assert!(early > 0.0 && early < 60.0, "{early}");

    tokio::time::sleep(Duration::from_secs(50)).await;
    assert_eq!(lane.progress(), Some(95.0));

    ready(pending.await.expect("join"));
    assert_eq!(lane.progress(), Some(100.0));
    assert!(!lane.has_active_ticker());
}

#[tokio::test(start_paused = true)]
async fn replace_discards_stale_in_flight_result() {
    let probe = FakeProbe::default().with("first.mp4", ProbeScript::default().delayed(SLOW));
    let (lane, _, registry) = video_lane(probe);

    let first = tokio::spawn({
        let lane = lane.clone();
        async move { lane.select(mp4("first.mp4", MIB)).await }
    });
    tokio::task::yield_now().await;
    assert!(lane.is_busy());

    let second = ready(lane.replace(mp4("second.mp4", MIB)).await);
    assert_eq!(first.await.expect("join"), Ok(VideoSelection::Superseded));

    let attached = lane.attached().expect("second stays attached");
    assert_eq!(attached, second);
    assert_eq!(lane.state(), VideoLaneState::Ready);
    assert!(!lane.has_active_ticker());
    assert_eq!(registry.live(), vec![second.preview_url]);
}

#[tokio::test(start_paused = true)]
async fn clear_cancels_in_flight_selection() {
    let probe = FakeProbe::default().with("slow.mp4", ProbeScript::default().delayed(SLOW));
    let (lane, _, registry) = video_lane(probe);

    let pending = tokio::spawn({
        let lane = lane.clone();
        async move { lane.select(mp4("slow.mp4", MIB)).await }
    });
    tokio::task::yield_now().await;
    lane.clear();

    assert!(!lane.has_active_ticker());
    assert_eq!(lane.progress(), None);
    assert_eq!(pending.await.expect("join"), Ok(VideoSelection::Superseded));
    assert_eq!(lane.state(), VideoLaneState::Idle);
    assert!(lane.attached().is_none());
    assert!(registry.live().is_empty());
}

#[tokio::test(start_paused = true)]
async fn thumbnail_can_be_reselected_without_revalidation() {
    let (lane, probe, _) = video_lane(FakeProbe::default());
    assert_eq!(lane.select_thumbnail(0), Err(LaneError::NotReady));

    ready(lane.select(mp4("clip.mp4", MIB)).await);
    let media = lane.select_thumbnail(2).expect("in range");

    assert_eq!(media.thumbnail_url.as_deref(), Some("thumb-2"));
    assert_eq!(
        lane.attached().and_then(|video| video.thumbnail_url),
        Some("thumb-2".to_string())
    );
    assert_eq!(
        lane.select_thumbnail(5),
        Err(LaneError::ThumbnailOutOfRange {
            index: 5,
            available: 3
        })
    );
    assert_eq!(probe.decode_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn previews_are_revoked_on_replace_reject_and_drop() {
    let probe = FakeProbe::default().with("long.mp4", ProbeScript::lasting(300.0));
    let (lane, _, registry) = video_lane(probe);

    let first = ready(lane.select(mp4("a.mp4", MIB)).await);
    let second = ready(lane.select(mp4("b.mp4", MIB)).await);
    assert!(!registry.is_live(&first.preview_url));
    assert_eq!(registry.live(), vec![second.preview_url.clone()]);

    lane.select(mp4("long.mp4", MIB))
        .await
        .expect_err("too long");
    assert!(registry.live().is_empty());

    ready(lane.select(mp4("c.mp4", MIB)).await);
    assert_eq!(registry.live().len(), 1);
    drop(lane);
    assert!(registry.live().is_empty());
}

#[tokio::test(start_paused = true)]
async fn timed_out_selection_releases_the_lane() {
    let script = ProbeScript::default().delayed(Duration::from_secs(30));
    let (lane, _, registry) = video_lane(FakeProbe::default().with("slow.mp4", script));

    let timed_out = tokio::time::timeout(
        Duration::from_secs(1),
        lane.select(mp4("slow.mp4", 10 * MIB)),
    )
    .await;
    assert!(timed_out.is_err());

    assert_eq!(lane.state(), VideoLaneState::Idle);
    assert!(!lane.has_active_ticker());
    assert_eq!(lane.progress(), None);
    assert!(registry.live().is_empty());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(lane.state(), VideoLaneState::Idle);
    let media = ready(lane.select(mp4("next.mp4", 10 * MIB)).await);
    assert_eq!(media.file.name, "next.mp4");
}
