use crate::e2e::helpers;

use longform_tts::domain::narration::{NarrationError, NarrationServiceApi};
use longform_tts::domain::synthesis::RunEvent;
use helpers::fixtures::{chunk_values, write_wav};
use helpers::{FakeFactory, PipelineContext, Step, FIVE_CHUNKS};
use longform_tts::infrastructure::config::ConfigError;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use test_context::test_context;
use tokio::sync::Notify;

#[test_context(PipelineContext)]
#[tokio::test]
async fn it_should_synthesize_every_chunk_and_merge_in_order(ctx: &mut PipelineContext) {
    let factory = FakeFactory::new(vec![]);
    let service = ctx.service(factory.clone(), ctx.settings());

    let report = service
        .synthesize(FIVE_CHUNKS, &ctx.output_dir())
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.expected, 5);
    assert_eq!(report.completed, 5);
    assert_eq!(report.newly_completed, vec![1, 2, 3, 4, 5]);
    assert_eq!(report.restarts, 0);
    assert_eq!(report.merged, Some(ctx.final_path()));
    assert_eq!(chunk_values(&ctx.final_path()), vec![1, 2, 3, 4, 5]);

    let state = factory.state();
    assert_eq!(
        state.submitted(),
        vec![
            "Chunk one is here.",
            "Chunk two is here.",
            "Chunk three is here.",
            "Chunk four is here.",
            "Chunk five is here.",
        ]
    );
    assert_eq!(state.created(), 1);
    assert_eq!(state.closed(), 1);
}

#[test_context(PipelineContext)]
#[tokio::test]
async fn it_should_fail_a_chunk_after_two_corrupt_artifacts_and_keep_going(
    ctx: &mut PipelineContext,
) {
    let factory = FakeFactory::new(vec![Step::Audio, Step::Corrupt, Step::Corrupt]);
    let service = ctx.service(factory.clone(), ctx.settings());

    let report = service
        .synthesize(FIVE_CHUNKS, &ctx.output_dir())
        .await
        .unwrap();

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].index, 2);
    assert_eq!(report.failed[0].attempts, 2);
    assert_eq!(report.newly_completed, vec![1, 3, 4, 5]);
    assert_eq!(report.missing, vec![2]);
    assert_eq!(report.merged, None);
    assert!(!report.is_complete());

    assert!(!ctx.chunk_path(2).exists());
    assert!(ctx.chunk_path(5).exists());
    assert!(!ctx.final_path().exists());
    assert_eq!(
        ctx.events
            .count(|e| matches!(e, RunEvent::MergeSkipped { missing } if missing == &vec![2])),
        1
    );

    // no temporaries are left next to the chunks
    let leftovers = std::fs::read_dir(ctx.output_dir())
        .unwrap()
        .filter(|e| {
            let name = e.as_ref().unwrap().file_name();
            name.to_string_lossy().ends_with(".tmp")
        })
        .count();
    assert_eq!(leftovers, 0);
}

#[test_context(PipelineContext)]
#[tokio::test]
async fn it_should_restart_the_session_once_after_a_fatal_error(ctx: &mut PipelineContext) {
    let factory = FakeFactory::new(vec![Step::Audio, Step::Audio, Step::Fatal]);
    let service = ctx.service(factory.clone(), ctx.settings());

    let report = service
        .synthesize(FIVE_CHUNKS, &ctx.output_dir())
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.restarts, 1);
    assert_eq!(report.newly_completed, vec![1, 2, 3, 4, 5]);
    assert!(report.failed.is_empty());
    assert_eq!(chunk_values(&ctx.final_path()), vec![1, 2, 3, 4, 5]);

    let state = factory.state();
    assert_eq!(state.created(), 2);
    assert_eq!(state.closed(), 2);
    assert_eq!(
        ctx.events
            .count(|e| matches!(e, RunEvent::SessionRestarted { restarts: 1, .. })),
        1
    );
    // chunk 3 was submitted once to each session
    let third = state
        .submitted()
        .iter()
        .filter(|text| text.as_str() == "Chunk three is here.")
        .count();
    assert_eq!(third, 2);
}

#[test_context(PipelineContext)]
#[tokio::test]
async fn it_should_abort_when_restarts_are_exhausted_and_resume_later(ctx: &mut PipelineContext) {
    let mut settings = ctx.settings();
    settings.max_restarts = 1;
    let factory = FakeFactory::new(vec![Step::Audio, Step::Fatal, Step::Fatal]);
    let service = ctx.service(factory.clone(), settings.clone());

    let report = service
        .synthesize(FIVE_CHUNKS, &ctx.output_dir())
        .await
        .unwrap();

    assert!(report.aborted.is_some());
    assert_eq!(report.restarts, 1);
    assert_eq!(report.completed, 1);
    assert_eq!(report.missing, vec![2, 3, 4, 5]);
    assert!(ctx.chunk_path(1).exists());
    assert!(!ctx.final_path().exists());
    assert_eq!(factory.state().created(), factory.state().closed());

    let resumed = FakeFactory::new(vec![]);
    let report = ctx
        .service(resumed.clone(), settings)
        .synthesize(FIVE_CHUNKS, &ctx.output_dir())
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.already_done, 1);
    assert_eq!(report.newly_completed, vec![2, 3, 4, 5]);
    assert!(!resumed
        .state()
        .submitted()
        .contains(&"Chunk one is here.".to_string()));
}

#[test_context(PipelineContext)]
#[tokio::test]
async fn it_should_ignore_an_artifact_left_over_from_the_previous_chunk(
    ctx: &mut PipelineContext,
) {
    let factory = FakeFactory::new(vec![Step::Audio, Step::Repeat, Step::Audio]);
    let service = ctx.service(factory, ctx.settings());

    let report = service
        .synthesize("First one here. Second one here.", &ctx.output_dir())
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(chunk_values(&ctx.final_path()), vec![1, 2]);
    assert_eq!(
        ctx.events
            .count(|e| matches!(e, RunEvent::StaleArtifactIgnored { index: 2, .. })),
        1
    );
}

#[test_context(PipelineContext)]
#[tokio::test]
async fn it_should_retry_a_chunk_after_a_timeout(ctx: &mut PipelineContext) {
    let factory = FakeFactory::new(vec![Step::Timeout]);
    let service = ctx.service(factory, ctx.settings());

    let report = service
        .synthesize("Only one sentence.", &ctx.output_dir())
        .await
        .unwrap();

    assert!(report.is_complete());
    assert!(report.failed.is_empty());
    assert_eq!(
        ctx.events
            .count(|e| matches!(e, RunEvent::ChunkRetrying { index: 1, attempt: 1, .. })),
        1
    );
}

#[test_context(PipelineContext)]
#[tokio::test]
async fn it_should_skip_the_session_when_every_chunk_exists(ctx: &mut PipelineContext) {
    std::fs::create_dir_all(ctx.output_dir()).unwrap();
    for index in 1..=5 {
        write_wav(&ctx.chunk_path(index), index as i16 * 10);
    }
    let factory = FakeFactory::new(vec![]);
    let service = ctx.service(factory.clone(), ctx.settings());

    let report = service
        .synthesize(FIVE_CHUNKS, &ctx.output_dir())
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.already_done, 5);
    assert!(report.newly_completed.is_empty());
    assert_eq!(factory.state().created(), 0);
    assert_eq!(chunk_values(&ctx.final_path()), vec![10, 20, 30, 40, 50]);
}

#[test_context(PipelineContext)]
#[tokio::test]
async fn it_should_reject_blank_input_before_creating_a_session(ctx: &mut PipelineContext) {
    let factory = FakeFactory::new(vec![]);
    let service = ctx.service(factory.clone(), ctx.settings());

    let result = service.synthesize(" \n\t  ", &ctx.output_dir()).await;

    assert!(matches!(result, Err(NarrationError::EmptyInput)));
    assert_eq!(factory.state().created(), 0);
    assert!(!ctx.output_dir().exists());
}

#[test_context(PipelineContext)]
#[tokio::test]
async fn it_should_remove_partials_from_a_crashed_run(ctx: &mut PipelineContext) {
    std::fs::create_dir_all(ctx.output_dir()).unwrap();
    let partial = ctx.output_dir().join(".chunk-2-deadbeef.tmp");
    std::fs::write(&partial, b"half written").unwrap();

    let service = ctx.service(FakeFactory::new(vec![]), ctx.settings());
    let report = service
        .synthesize("First one here. Second one here.", &ctx.output_dir())
        .await
        .unwrap();

    assert!(report.is_complete());
    assert!(!partial.exists());
}

#[test_context(PipelineContext)]
#[tokio::test]
async fn it_should_close_the_session_when_the_run_is_interrupted(ctx: &mut PipelineContext) {
    let mut settings = ctx.settings();
    settings.inter_chunk_delay = Duration::from_secs(5);
    let factory = FakeFactory::new(vec![]);
    let interrupt = Arc::new(Notify::new());
    let service = ctx
        .service(factory.clone(), settings)
        .with_interrupt(interrupt.clone());

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        interrupt.notify_one();
    });
    let report = service
        .synthesize(FIVE_CHUNKS, &ctx.output_dir())
        .await
        .unwrap();

    assert_eq!(report.aborted.as_deref(), Some("run interrupted"));
    assert_eq!(report.newly_completed, vec![1]);
    assert_eq!(report.missing, vec![2, 3, 4, 5]);
    assert!(!ctx.final_path().exists());

    let state = factory.state();
    assert_eq!(state.created(), 1);
    assert_eq!(state.closed(), 1);
    assert_eq!(
        ctx.events
            .count(|e| matches!(e, RunEvent::RunAborted { .. })),
        1
    );
}

#[test_context(PipelineContext)]
#[tokio::test]
async fn it_should_close_the_session_when_the_run_is_dropped(ctx: &mut PipelineContext) {
    let mut settings = ctx.settings();
    settings.inter_chunk_delay = Duration::from_secs(5);
    let factory = FakeFactory::new(vec![]);
    let service = ctx.service(factory.clone(), settings);

    let result = tokio::time::timeout(
        Duration::from_millis(100),
        service.synthesize(FIVE_CHUNKS, &ctx.output_dir()),
    )
    .await;
    assert!(result.is_err());

    // the abandoned session is closed on a spawned task
    tokio::time::sleep(Duration::from_millis(50)).await;
    let state = factory.state();
    assert_eq!(state.created(), 1);
    assert_eq!(state.closed(), 1);
    assert!(ctx.chunk_path(1).exists());
}

#[test_context(PipelineContext)]
#[tokio::test]
async fn it_should_refuse_a_final_name_that_is_a_chunk_name(ctx: &mut PipelineContext) {
    let mut settings = ctx.settings();
    settings.final_filename = "chunk_03.wav".to_string();
    let factory = FakeFactory::new(vec![]);
    let service = ctx.service(factory.clone(), settings);

    let result = service.synthesize(FIVE_CHUNKS, &ctx.output_dir()).await;

    assert!(matches!(
        result,
        Err(NarrationError::Config(ConfigError::Setting(_)))
    ));
    assert_eq!(factory.state().created(), 0);
    assert!(!ctx.output_dir().exists());
}
