//! End-to-end pipeline scenarios over a scripted model transport and a
//! recording media fake.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use clipcut_llm::{LlmClient, LlmError, LlmResult, LlmTransport};
use clipcut_media::MediaResult;
use clipcut_models::{Clip, Collection, Project, ProjectStatus, StatusSnapshot, VideoCategory};
use clipcut_pipeline::{
    AppConfig, MediaProcessor, PipelineRunner, PromptLibrary, StartError,
};
use clipcut_storage::ArtifactStore;

const FIXTURE_SRT: &str = "1\n00:00:00,000 --> 00:00:02,000\nHello world.\n\n\
2\n00:00:02,500 --> 00:00:05,000\nInvesting in stocks requires patience.\n\n\
3\n00:00:06,200 --> 00:00:09,000\nCooking pasta is easy.\n";

const OUTLINE_RESPONSE: &str = "1. **Investing**\n- patience\n2. **Cooking**\n- pasta";
const TIMELINE_RESPONSE: &str = r#"[
  {"outline": "Investing", "content": ["patience"], "start_time": "00:00:02,500", "end_time": "00:00:05,000"},
  {"outline": "Cooking", "content": ["pasta"], "start_time": "00:00:06,200", "end_time": "00:00:09,000"}
]"#;
const SCORES_RESPONSE: &str = r#"[
  {"final_score": 0.9, "recommend_reason": "strong"},
  {"final_score": 0.8, "recommend_reason": "fun"}
]"#;
const TITLES_RESPONSE: &str = r#"{"1": "Patience Pays", "2": "Pasta 101"}"#;
const CLUSTER_RESPONSE: &str = r#"[
  {"collection_title": "Life Tips", "collection_summary": "", "clips": ["Patience Pays", "Pasta 101"]}
]"#;

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

#[derive(Clone)]
enum Step {
    Text(String),
    TransportError,
}

/// Scripted transport: responses are keyed by the prompt-file prefix each
/// stage sends. A key's last step repeats once the queue drains, and the
/// script can be rewritten mid-test (scenario C).
#[derive(Clone, Default)]
struct Script {
    steps: Arc<Mutex<HashMap<&'static str, Vec<Step>>>>,
}

impl Script {
    fn set(&self, key: &'static str, steps: Vec<Step>) {
        self.steps.lock().unwrap().insert(key, steps);
    }

    fn next(&self, prompt: &str) -> Option<Step> {
        let mut steps = self.steps.lock().unwrap();
        let key = steps.keys().find(|k| prompt.starts_with(**k)).copied()?;
        let queue = steps.get_mut(key)?;
        if queue.len() > 1 {
            Some(queue.remove(0))
        } else {
            queue.first().cloned()
        }
    }
}

struct ScriptedTransport {
    script: Script,
}

#[async_trait]
impl LlmTransport for ScriptedTransport {
    async fn generate(&self, prompt: &str) -> LlmResult<String> {
        match self.script.next(prompt) {
            Some(Step::Text(text)) => Ok(text),
            Some(Step::TransportError) => Err(LlmError::transport("scripted failure")),
            None => Err(LlmError::transport(format!(
                "no scripted response for prompt: {}",
                prompt.lines().next().unwrap_or("")
            ))),
        }
    }
}

/// Media fake: records every cut and concat, and creates the output files so
/// glob lookups and downloads behave like the real thing.
#[derive(Default)]
struct RecordingMedia {
    extracts: Mutex<Vec<(PathBuf, String, String)>>,
    concats: Mutex<Vec<(Vec<PathBuf>, PathBuf)>>,
}

#[async_trait]
impl MediaProcessor for RecordingMedia {
    async fn extract(
        &self,
        _input: &Path,
        output: &Path,
        start_time: &str,
        end_time: &str,
    ) -> MediaResult<()> {
        std::fs::create_dir_all(output.parent().unwrap())?;
        std::fs::write(output, b"stub video")?;
        self.extracts.lock().unwrap().push((
            output.to_path_buf(),
            start_time.to_string(),
            end_time.to_string(),
        ));
        Ok(())
    }

    async fn concat(&self, files: &[PathBuf], output: &Path) -> MediaResult<()> {
        std::fs::create_dir_all(output.parent().unwrap())?;
        std::fs::write(output, b"stub collection")?;
        self.concats
            .lock()
            .unwrap()
            .push((files.to_vec(), output.to_path_buf()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct TestEnv {
    _dir: tempfile::TempDir,
    runner: PipelineRunner,
    store: ArtifactStore,
    script: Script,
    media: Arc<RecordingMedia>,
    observed: Arc<Mutex<Vec<(u8, f64)>>>,
    prompt_dir: PathBuf,
}

impl TestEnv {
    fn new(max_concurrent: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();

        let prompt_dir = dir.path().join("prompt");
        std::fs::create_dir_all(&prompt_dir).unwrap();
        for (file, content) in [
            ("outline.txt", "OUTLINE"),
            ("timeline.txt", "TIMELINE"),
            ("recommendation.txt", "RECOMMEND"),
            ("title.txt", "TITLE"),
            ("clustering.txt", "CLUSTER"),
        ] {
            std::fs::write(prompt_dir.join(file), content).unwrap();
        }

        let config = Arc::new(AppConfig {
            projects_root: dir.path().join("uploads"),
            prompt_dir,
            llm_max_retries: 1,
            max_concurrent_processing: max_concurrent,
            ..AppConfig::default()
        });

        let script = Script::default();
        script.set("OUTLINE", vec![Step::Text(OUTLINE_RESPONSE.to_string())]);
        script.set("TIMELINE", vec![Step::Text(TIMELINE_RESPONSE.to_string())]);
        script.set("RECOMMEND", vec![Step::Text(SCORES_RESPONSE.to_string())]);
        script.set("TITLE", vec![Step::Text(TITLES_RESPONSE.to_string())]);
        script.set("CLUSTER", vec![Step::Text(CLUSTER_RESPONSE.to_string())]);

        let store = ArtifactStore::new(&config.projects_root);
        let media = Arc::new(RecordingMedia::default());
        let llm = Arc::new(LlmClient::new(
            Box::new(ScriptedTransport { script: script.clone() }),
            1,
        ));
        let prompts = Arc::new(PromptLibrary::new(&config.prompt_dir));

        let observed: Arc<Mutex<Vec<(u8, f64)>>> = Arc::new(Mutex::new(Vec::new()));
        let observer_log = observed.clone();
        let prompt_dir = config.prompt_dir.clone();
        let runner = PipelineRunner::new(store.clone(), llm, prompts, media.clone(), config)
            .with_observer(Box::new(move |stage, _total, _name, percent| {
                observer_log.lock().unwrap().push((stage, percent));
            }));

        let env = Self {
            prompt_dir,
            _dir: dir,
            runner,
            store,
            script,
            media,
            observed,
        };
        env.create_project("p1", FIXTURE_SRT);
        env
    }

    fn create_project(&self, id: &str, srt: &str) {
        self.store.ensure_project_directories(id).unwrap();
        let paths = self.store.paths(id);
        std::fs::write(paths.input_video("mp4"), b"source video").unwrap();
        std::fs::write(paths.input_srt(), srt).unwrap();
        let mut project = Project::new(
            id,
            "Fixture Talk",
            format!("{}/input/input.mp4", id),
            VideoCategory::Default,
        );
        project.srt_path = Some(format!("{}/input/input.srt", id));
        self.store.save_project(&project).unwrap();
    }

    async fn wait_for_terminal(&self, id: &str) -> StatusSnapshot {
        for _ in 0..500 {
            if self.runner.active_runs() == 0 {
                if let Ok(Some(snapshot)) = self.runner.status(id) {
                    if matches!(
                        snapshot.status,
                        ProjectStatus::Completed | ProjectStatus::Error
                    ) {
                        return snapshot;
                    }
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("pipeline did not reach a terminal state");
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn single_chunk_happy_path() {
    let env = TestEnv::new(1);
    env.runner.start("p1").unwrap();
    let snapshot = env.wait_for_terminal("p1").await;

    assert_eq!(snapshot.status, ProjectStatus::Completed);
    assert_eq!(snapshot.current_step, 6);
    assert!((snapshot.progress - 100.0).abs() < f64::EPSILON);

    let paths = env.store.paths("p1");
    assert!(paths.clips_dir.join("1_Patience_Pays.mp4").is_file());
    assert!(paths.clips_dir.join("2_Pasta_101.mp4").is_file());
    assert!(paths.collections_dir.join("Life_Tips.mp4").is_file());

    // Durable ids follow timeline order
    let timeline: Vec<Clip> = env.store.read_json(paths.timeline_file()).unwrap().unwrap();
    assert_eq!(
        timeline.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
        vec!["1", "2"]
    );

    // Concat order equals clip_ids order
    let concats = env.media.concats.lock().unwrap();
    assert_eq!(concats.len(), 1);
    let (files, _) = &concats[0];
    assert!(files[0].ends_with("1_Patience_Pays.mp4"));
    assert!(files[1].ends_with("2_Pasta_101.mp4"));

    let project = env.store.load_project("p1").unwrap().unwrap();
    assert_eq!(project.status, ProjectStatus::Completed);
    assert_eq!(project.current_step, 6);

    // Progress reporting: entry at ((n-1)/6)*100 and exit at (n/6)*100 for
    // every stage, ending on 100
    let observed = env.observed.lock().unwrap();
    assert_eq!(observed.first(), Some(&(1, 0.0)));
    assert_eq!(observed.last(), Some(&(6, 100.0)));
    assert_eq!(observed.len(), 12);
    for (i, (stage, percent)) in observed.iter().enumerate() {
        let n = (i / 2 + 1) as u8;
        assert_eq!(*stage, n);
        let expected = if i % 2 == 0 {
            f64::from(n - 1) / 6.0 * 100.0
        } else {
            f64::from(n) / 6.0 * 100.0
        };
        assert!((percent - expected).abs() < 1e-9);
    }
}

#[tokio::test]
async fn sub_threshold_clips_are_filtered() {
    let env = TestEnv::new(1);
    env.script.set(
        "RECOMMEND",
        vec![Step::Text(
            r#"[{"final_score": 0.9, "recommend_reason": "strong"},
                {"final_score": 0.5, "recommend_reason": "weak"}]"#
                .to_string(),
        )],
    );
    env.script.set("CLUSTER", vec![Step::Text("[]".to_string())]);
    env.script
        .set("TITLE", vec![Step::Text(r#"{"1": "Patience Pays"}"#.to_string())]);

    env.runner.start("p1").unwrap();
    let snapshot = env.wait_for_terminal("p1").await;
    assert_eq!(snapshot.status, ProjectStatus::Completed);

    let paths = env.store.paths("p1");
    let high_score: Vec<Clip> = env.store.read_json(paths.high_score_file()).unwrap().unwrap();
    assert_eq!(high_score.len(), 1);
    assert_eq!(high_score[0].id, "1");

    assert!(paths.clips_dir.join("1_Patience_Pays.mp4").is_file());
    assert!(!paths.clips_dir.join("2_Pasta_101.mp4").exists());

    // One surviving clip cannot form a collection
    let collections: Vec<Collection> =
        env.store.read_json(paths.collections_file()).unwrap().unwrap();
    assert!(collections.is_empty());
    assert!(env.media.concats.lock().unwrap().is_empty());
}

#[tokio::test]
async fn mid_pipeline_failure_and_retry() {
    let env = TestEnv::new(1);
    // Break stage 4 outright: its prompt cannot be resolved
    let title_prompt = env.prompt_dir.join("title.txt");
    std::fs::remove_file(&title_prompt).unwrap();

    env.runner.start("p1").unwrap();
    let snapshot = env.wait_for_terminal("p1").await;
    assert_eq!(snapshot.status, ProjectStatus::Error);
    assert_eq!(snapshot.current_step, 4);
    assert!(snapshot.error_message.is_some());

    let paths = env.store.paths("p1");
    let before: Vec<Vec<u8>> = [
        paths.outline_file(),
        paths.timeline_file(),
        paths.all_scored_file(),
        paths.high_score_file(),
    ]
    .iter()
    .map(|p| std::fs::read(p).unwrap())
    .collect();

    // Restore the prompt and retry; the run resumes at stage 4
    std::fs::write(&title_prompt, "TITLE").unwrap();
    env.runner.retry("p1").unwrap();
    let snapshot = env.wait_for_terminal("p1").await;
    assert_eq!(snapshot.status, ProjectStatus::Completed);

    let after: Vec<Vec<u8>> = [
        paths.outline_file(),
        paths.timeline_file(),
        paths.all_scored_file(),
        paths.high_score_file(),
    ]
    .iter()
    .map(|p| std::fs::read(p).unwrap())
    .collect();
    assert_eq!(before, after, "earlier stage artifacts must be untouched");

    assert!(paths.clips_dir.join("1_Patience_Pays.mp4").is_file());
}

#[tokio::test]
async fn scoring_failure_degrades_to_zero_scores() {
    let env = TestEnv::new(1);
    env.script.set("RECOMMEND", vec![Step::TransportError]);

    env.runner.start("p1").unwrap();
    let snapshot = env.wait_for_terminal("p1").await;
    // The chunk's batch is marked failed; the pipeline still completes
    assert_eq!(snapshot.status, ProjectStatus::Completed);

    let paths = env.store.paths("p1");
    let all_scored: Vec<Clip> = env.store.read_json(paths.all_scored_file()).unwrap().unwrap();
    assert_eq!(all_scored.len(), 2);
    for clip in &all_scored {
        assert_eq!(clip.final_score, Some(0.0));
        assert_eq!(clip.recommend_reason.as_deref(), Some("batch evaluation failed"));
    }
    let high_score: Vec<Clip> = env.store.read_json(paths.high_score_file()).unwrap().unwrap();
    assert!(high_score.is_empty());
}

#[tokio::test]
async fn title_failure_falls_back_to_outlines() {
    let env = TestEnv::new(1);
    env.script.set("TITLE", vec![Step::TransportError]);
    env.script.set("CLUSTER", vec![Step::Text("[]".to_string())]);

    env.runner.start("p1").unwrap();
    let snapshot = env.wait_for_terminal("p1").await;
    assert_eq!(snapshot.status, ProjectStatus::Completed);

    // Every clip keeps its outline as the title; none are dropped
    let paths = env.store.paths("p1");
    let titled: Vec<Clip> = env.store.read_json(paths.titles_file()).unwrap().unwrap();
    assert_eq!(titled.len(), 2);
    for clip in &titled {
        assert_eq!(clip.generated_title.as_deref(), Some(clip.outline.as_str()));
    }
}

#[tokio::test]
async fn title_mismatch_resolved_by_matcher() {
    let env = TestEnv::new(1);
    env.script.set(
        "CLUSTER",
        vec![Step::Text(
            r#"[{"collection_title": "Life Tips", "collection_summary": "",
                 "clips": ["Patience pays!", "Pasta 101"]}]"#
                .to_string(),
        )],
    );

    env.runner.start("p1").unwrap();
    let snapshot = env.wait_for_terminal("p1").await;
    assert_eq!(snapshot.status, ProjectStatus::Completed);

    let paths = env.store.paths("p1");
    let collections: Vec<Collection> =
        env.store.read_json(paths.collections_file()).unwrap().unwrap();
    assert_eq!(collections.len(), 1);
    assert_eq!(collections[0].clip_ids, vec!["1", "2"]);
}

#[tokio::test]
async fn truncated_timeline_json_recovers() {
    let env = TestEnv::new(1);
    env.script.set(
        "TIMELINE",
        vec![Step::Text(
            "[{\"outline\": \"Investing\", \"content\": [\"patience\"], \"start_time\": \"00:00:02,500\", \"end_time\": \"00:00:05,000\"}, {\"outline\": \"Cooking\", \"start_time\": \"00:00:0…"
                .to_string(),
        )],
    );
    env.script.set(
        "RECOMMEND",
        vec![Step::Text(
            r#"[{"final_score": 0.9, "recommend_reason": "strong"}]"#.to_string(),
        )],
    );
    env.script
        .set("TITLE", vec![Step::Text(r#"{"1": "Patience Pays"}"#.to_string())]);
    env.script.set("CLUSTER", vec![Step::Text("[]".to_string())]);

    env.runner.start("p1").unwrap();
    let snapshot = env.wait_for_terminal("p1").await;
    assert_eq!(snapshot.status, ProjectStatus::Completed);

    let paths = env.store.paths("p1");
    // The incomplete trailing element was dropped, the complete one kept
    let timeline: Vec<Clip> = env.store.read_json(paths.timeline_file()).unwrap().unwrap();
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0].outline, "Investing");

    // The raw response was persisted for debugging
    assert!(paths.timeline_raw_attempt_file(0, 0).is_file());
}

#[tokio::test]
async fn concurrent_start_attempts_conflict() {
    let env = TestEnv::new(2);

    let first = env.runner.start("p1");
    let second = env.runner.start("p1");
    assert!(first.is_ok());
    assert!(matches!(second, Err(StartError::Conflict)));

    let snapshot = env.wait_for_terminal("p1").await;
    assert_eq!(snapshot.status, ProjectStatus::Completed);
    assert_eq!(env.runner.active_runs(), 0);

    // Exactly one worker ran the media stage
    assert_eq!(env.media.extracts.lock().unwrap().len(), 2);
    assert_eq!(env.media.concats.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn empty_subtitles_complete_with_nothing() {
    let env = TestEnv::new(1);
    let paths = env.store.paths("p1");
    std::fs::write(paths.input_srt(), "").unwrap();

    env.runner.start("p1").unwrap();
    let snapshot = env.wait_for_terminal("p1").await;
    assert_eq!(snapshot.status, ProjectStatus::Completed);
    assert_eq!(snapshot.current_step, 6);

    let outlines: Vec<serde_json::Value> =
        env.store.read_json(paths.outline_file()).unwrap().unwrap();
    assert!(outlines.is_empty());
    let clips: Vec<Clip> = env.store.read_json(paths.clips_metadata_file()).unwrap().unwrap();
    assert!(clips.is_empty());
    assert!(env.media.extracts.lock().unwrap().is_empty());
    assert!(env.media.concats.lock().unwrap().is_empty());
}

#[tokio::test]
async fn retry_is_rejected_unless_failed() {
    let env = TestEnv::new(1);
    env.runner.start("p1").unwrap();
    let snapshot = env.wait_for_terminal("p1").await;
    assert_eq!(snapshot.status, ProjectStatus::Completed);

    assert!(matches!(
        env.runner.retry("p1"),
        Err(StartError::InvalidState { .. })
    ));
}
