use crate::e2e::helpers;

use longform_tts::domain::merge::MergeError;
use longform_tts::domain::narration::{NarrationError, NarrationServiceApi};
use helpers::fixtures::{chunk_values, write_wav};
use helpers::{FakeFactory, PipelineContext, FIVE_CHUNKS};
use pretty_assertions::assert_eq;
use test_context::test_context;

#[test_context(PipelineContext)]
#[tokio::test]
async fn it_should_plan_without_creating_a_session(ctx: &mut PipelineContext) {
    std::fs::create_dir_all(ctx.output_dir()).unwrap();
    write_wav(&ctx.chunk_path(2), 2);
    write_wav(&ctx.chunk_path(4), 4);
    let factory = FakeFactory::new(vec![]);
    let service = ctx.service(factory.clone(), ctx.settings());

    let first = service.plan(FIVE_CHUNKS, &ctx.output_dir()).unwrap();
    let second = service.plan(FIVE_CHUNKS, &ctx.output_dir()).unwrap();

    assert_eq!(first.total, 5);
    assert_eq!(first.pending, vec![1, 3, 5]);
    assert_eq!(first.already_done, vec![2, 4]);
    assert_eq!(first, second);
    assert_eq!(factory.state().created(), 0);
}

#[test_context(PipelineContext)]
#[tokio::test]
async fn it_should_merge_existing_chunks_by_index(ctx: &mut PipelineContext) {
    std::fs::create_dir_all(ctx.output_dir()).unwrap();
    for index in [4, 2, 5, 1, 3] {
        write_wav(&ctx.chunk_path(index), index as i16);
    }
    let service = ctx.service(FakeFactory::new(vec![]), ctx.settings());

    let path = service
        .merge_existing(FIVE_CHUNKS, &ctx.output_dir())
        .unwrap();

    assert_eq!(path, ctx.final_path());
    assert_eq!(chunk_values(&path), vec![1, 2, 3, 4, 5]);
}

#[test_context(PipelineContext)]
#[tokio::test]
async fn it_should_refuse_to_merge_an_incomplete_set(ctx: &mut PipelineContext) {
    std::fs::create_dir_all(ctx.output_dir()).unwrap();
    write_wav(&ctx.chunk_path(1), 1);
    write_wav(&ctx.chunk_path(3), 3);
    let service = ctx.service(FakeFactory::new(vec![]), ctx.settings());

    let err = service
        .merge_existing(FIVE_CHUNKS, &ctx.output_dir())
        .unwrap_err();

    match err {
        NarrationError::Merge(MergeError::IncompleteSet { missing, found, .. }) => {
            assert_eq!(missing, vec![2, 4, 5]);
            assert_eq!(found, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!ctx.final_path().exists());
}

#[test_context(PipelineContext)]
#[tokio::test]
async fn it_should_name_the_corrupt_chunk_and_leave_no_output(ctx: &mut PipelineContext) {
    std::fs::create_dir_all(ctx.output_dir()).unwrap();
    for index in 1..=5 {
        write_wav(&ctx.chunk_path(index), index as i16);
    }
    std::fs::write(ctx.chunk_path(4), b"not a wav").unwrap();
    let service = ctx.service(FakeFactory::new(vec![]), ctx.settings());

    let err = service
        .merge_existing(FIVE_CHUNKS, &ctx.output_dir())
        .unwrap_err();

    assert!(matches!(
        err,
        NarrationError::Merge(MergeError::Corrupt { index: 4, .. })
    ));
    assert!(!ctx.final_path().exists());
}
