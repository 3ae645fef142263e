use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use api_client::HttpBackend;
use cardiosim_core::config::{
    analysis_mode_from_env_value, backend_url_from_env_value, scenarios_path_from_env_value,
};
use cardiosim_core::{
    AnalysisOutcome, Audience, CoreConfig, EmergencyOutcome, ExplanationOutcome, HealthMonitor,
    MentorOutcome, ProcedureStage, ScenarioCatalogue, Session, VideoProcedure,
};
use cardiosim_pose::synthetic::{DEFAULT_FRAME_INTERVAL, ScriptedModel, SyntheticCamera};
use cardiosim_pose::{
    COMPRESSION_STEP, CanvasSize, CprCoach, Metronome, PoseConfig, PosePipeline, RecordingCanvas,
    metronome_bpm_from_env_value,
};

const HELP: &str = "\
commands:
  scenarios                   list preset scenarios
  load <id>                   load a scenario into the form
  analyze                     analyze the current form (runs in the background)
  explain [patient|clinician] explain the current diagnosis
  emergency                   fetch emergency guidance for a critical diagnosis
  check <n>                   tick or untick emergency step n
  image <path>                send a JPEG of the patient for emergency assessment
  simulate | stop             start or stop the stent procedure timeline
  mentor [stage]              mentor walkthrough for a stage (default: current stage)
  ask <question>              ask the mentor about the current stage
  video <procedure>           training video for STEMI, CPR or PCI_BALLOON
  cpr [seconds]               run the CPR compression guide on a synthetic camera
  status                      show session state and backend mode
  reset                       clear the session
  quit";

/// Interactive CardioSim session
///
/// Reads commands from stdin and drives a single [`Session`] against the configured backend,
/// while a [`HealthMonitor`] polls the backend in the background.
///
/// # Environment Variables
/// - `CARDIOSIM_BACKEND_URL`: backend base URL (default: "http://localhost:8000")
/// - `CARDIOSIM_MODE`: "demo" or "live" (default: "demo")
/// - `CARDIOSIM_SCENARIOS`: optional path to a scenario YAML file
/// - `CARDIOSIM_METRONOME_BPM`: compression pace for `cpr` (default: 110)
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(log_filter()?)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mode = analysis_mode_from_env_value(std::env::var("CARDIOSIM_MODE").ok())?;
    let url = backend_url_from_env_value(std::env::var("CARDIOSIM_BACKEND_URL").ok());
    let scenarios = scenarios_path_from_env_value(std::env::var("CARDIOSIM_SCENARIOS").ok())?;
    let cfg = CoreConfig::new(url, mode)?.with_scenarios_path(scenarios);

    let catalogue = Arc::new(
        ScenarioCatalogue::from_config(&cfg).context("failed to load scenario catalogue")?,
    );
    let backend = Arc::new(HttpBackend::new(&cfg)?);
    let monitor = HealthMonitor::spawn(backend.clone(), &cfg);
    let session = Session::new(cfg.clone(), catalogue, backend);

    tracing::info!(
        "CardioSim ready: {} scenarios, {:?} mode, backend {}",
        session.catalogue().len(),
        cfg.analysis_mode(),
        cfg.backend_url()
    );
    println!("{HELP}");

    let shutdown = CancellationToken::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        let arg = words.next();

        match command {
            "scenarios" => {
                for scenario in session.catalogue().iter() {
                    println!("  {:<12} {}", scenario.id(), scenario.label);
                }
            }
            "load" => match arg.map(|id| session.load_scenario(id)) {
                Some(Ok(scenario)) => {
                    println!("{}", scenario.label);
                    println!("  {}", scenario.description);
                    println!(
                        "  {}, {}. {}",
                        scenario.real_world.patient_name,
                        scenario.real_world.setting,
                        scenario.real_world.stakes
                    );
                }
                Some(Err(e)) => println!("{e}"),
                None => println!("usage: load <id>"),
            },
            "analyze" => spawn_analysis(&session, &shutdown),
            "explain" => {
                let audience = match arg.map(str::parse::<Audience>).transpose() {
                    Ok(audience) => audience.unwrap_or_default(),
                    Err(e) => {
                        println!("{e}");
                        continue;
                    }
                };
                spawn_explanation(&session, audience, &shutdown);
            }
            "emergency" => spawn_emergency(&session, &shutdown),
            "check" => match arg.and_then(|n| n.parse::<usize>().ok()) {
                Some(n) if n > 0 => match session.toggle_emergency_step(n - 1) {
                    Ok(_) => print_checklist(&session),
                    Err(e) => println!("{e}"),
                },
                _ => println!("usage: check <step number>"),
            },
            "image" => match arg {
                Some(path) => {
                    let assessment = match tokio::fs::read(path).await {
                        Ok(bytes) => session.analyze_emergency_image(&bytes, "image/jpeg").await,
                        Err(e) => {
                            println!("cannot read {path}: {e}");
                            continue;
                        }
                    };
                    match assessment {
                        Ok(g) => println!("{} Next: {}", g.guidance, g.next_step),
                        Err(e) => println!("{e}"),
                    }
                }
                None => println!("usage: image <path>"),
            },
            "mentor" => {
                let stage = match arg.map(str::parse::<ProcedureStage>).transpose() {
                    Ok(stage) => stage
                        .or(session.snapshot().simulation_stage)
                        .unwrap_or(ProcedureStage::Blocked),
                    Err(e) => {
                        println!("{e}");
                        continue;
                    }
                };
                spawn_mentor(&session, stage, None, &shutdown);
            }
            "ask" => {
                let question = line.trim_start().trim_start_matches("ask").trim().to_string();
                let stage = session.snapshot().mentor.map(|m| m.stage);
                match stage {
                    Some(stage) if !question.is_empty() => {
                        spawn_mentor(&session, stage, Some(question), &shutdown)
                    }
                    Some(_) => println!("usage: ask <question>"),
                    None => println!("run 'mentor' first"),
                }
            }
            "video" => match arg.map(str::parse::<VideoProcedure>) {
                Some(Ok(procedure)) => match session.procedure_video(procedure).await {
                    Ok(video) => {
                        println!("{} ({})", video.description, video.status);
                        match &video.video_url {
                            Some(url) => println!("  {url}"),
                            None => video.frames.iter().for_each(|f| println!("  - {f}")),
                        }
                    }
                    Err(e) => println!("{e}"),
                },
                Some(Err(e)) => println!("{e}"),
                None => println!("usage: video <STEMI|CPR|PCI_BALLOON>"),
            },
            "simulate" => match session.start_simulation() {
                Ok(()) => println!("simulation started"),
                Err(e) => println!("{e}"),
            },
            "stop" => session.stop_simulation(),
            "cpr" => {
                let seconds = arg.and_then(|s| s.parse().ok()).unwrap_or(5);
                if let Err(e) = run_cpr(Duration::from_secs(seconds)).await {
                    println!("cpr guide failed: {e}");
                }
            }
            "status" => print_status(&session, &monitor),
            "reset" => {
                session.reset();
                println!("session cleared");
            }
            "help" => println!("{HELP}"),
            "quit" | "exit" => break,
            other => println!("unknown command '{other}', try 'help'"),
        }
    }

    shutdown.cancel();
    monitor.shutdown().await;
    tracing::info!("CardioSim stopped");
    Ok(())
}

/// `RUST_LOG` plus `info` for every workspace crate.
fn log_filter() -> anyhow::Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive("cardiosim_run=info".parse()?)
        .add_directive("cardiosim_core=info".parse()?)
        .add_directive("cardiosim_pose=info".parse()?)
        .add_directive("api_client=info".parse()?))
}

fn spawn_analysis(session: &Session, shutdown: &CancellationToken) {
    let session = session.clone();
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        let outcome = tokio::select! {
            _ = shutdown.cancelled() => return,
            outcome = session.analyze_form() => outcome,
        };
        match outcome {
            Ok(AnalysisOutcome::Diagnosed(d)) => {
                println!("[{}] {} ({})", d.urgency.badge(), d.diagnosis, d.artery.label());
                println!("  {}", d.recommended_intervention);
                if session.snapshot().emergency_guidance_visible() {
                    println!("  critical: 'emergency' for guidance");
                }
            }
            Ok(AnalysisOutcome::Failed(message)) => println!("analysis failed: {message}"),
            Ok(AnalysisOutcome::Superseded) => tracing::debug!("analysis superseded"),
            Err(e) => println!("{e}"),
        }
    });
}

fn spawn_explanation(session: &Session, audience: Audience, shutdown: &CancellationToken) {
    let session = session.clone();
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        let outcome = tokio::select! {
            _ = shutdown.cancelled() => return,
            outcome = session.explain(audience) => outcome,
        };
        match outcome {
            Ok(ExplanationOutcome::Complete(text)) => println!("({audience}) {text}"),
            Ok(ExplanationOutcome::Failed(message)) => println!("explanation failed: {message}"),
            Ok(ExplanationOutcome::Superseded) => tracing::debug!("explanation superseded"),
            Err(e) => println!("{e}"),
        }
    });
}

fn spawn_emergency(session: &Session, shutdown: &CancellationToken) {
    let session = session.clone();
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        let outcome = tokio::select! {
            _ = shutdown.cancelled() => return,
            outcome = session.emergency_guidance() => outcome,
        };
        match outcome {
            EmergencyOutcome::Guidance(g) => {
                println!("EMERGENCY PROTOCOL ({})", g.ai_provider);
                println!("{}", g.protocol);
                for (i, step) in g.visual_steps.iter().enumerate() {
                    println!("  [ ] {}. {}", i + 1, step);
                }
                println!("'check <n>' marks a step done");
            }
            EmergencyOutcome::NotRequired => println!("no emergency guidance required"),
            EmergencyOutcome::Superseded => {}
        }
    });
}

fn spawn_mentor(
    session: &Session,
    stage: ProcedureStage,
    question: Option<String>,
    shutdown: &CancellationToken,
) {
    let session = session.clone();
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        let outcome = tokio::select! {
            _ = shutdown.cancelled() => return,
            outcome = session.mentor_guidance(stage, question.as_deref()) => outcome,
        };
        match outcome {
            Ok(MentorOutcome::Guidance(g)) => {
                println!("MENTOR: {}", stage.label());
                println!("{}", g.guidance);
                for check in &g.safety_checks {
                    println!("  * {check}");
                }
            }
            Ok(MentorOutcome::Answer(a)) => println!("mentor: {}", a.answer),
            Ok(MentorOutcome::Superseded) => tracing::debug!("mentor request superseded"),
            Err(e) => println!("{e}"),
        }
    });
}

fn print_checklist(session: &Session) {
    let Some(guidance) = session.snapshot().emergency else {
        return;
    };
    for (i, step) in guidance.visual_steps.iter().enumerate() {
        let mark = if guidance.is_step_completed(i) { "x" } else { " " };
        println!("  [{mark}] {}. {}", i + 1, step);
    }
    println!(
        "{} of {} steps completed",
        guidance.completed_count(),
        guidance.visual_steps.len()
    );
}

fn print_status(session: &Session, monitor: &HealthMonitor) {
    let snap = session.snapshot();
    let backend = monitor.mode();
    println!("backend:   {} [{}]", backend, session.mode_badge(&backend));
    println!("phase:     {:?}", snap.phase);
    if let Some(scenario) = &snap.active_scenario {
        println!("scenario:  {}", scenario.id());
    }
    if let Some(d) = &snap.diagnosis {
        println!("diagnosis: {} / {} / {}", d.diagnosis, d.artery, d.urgency);
    }
    if let Some(explanation) = &snap.explanation {
        let state = if explanation.complete { "done" } else { "..." };
        println!("explain:   ({}, {}) {}", explanation.audience, state, explanation.text);
    }
    if snap.emergency_loading {
        println!("emergency: loading");
    }
    if let Some(g) = &snap.emergency {
        println!(
            "emergency: {} of {} steps completed",
            g.completed_count(),
            g.visual_steps.len()
        );
    }
    if let Some(m) = &snap.mentor {
        println!("mentor:    {} ({} questions)", m.stage.label(), snap.mentor_chat.len());
    } else if snap.mentor_loading {
        println!("mentor:    loading");
    }
    if let Some(stage) = snap.simulation_stage {
        println!("stent:     {}", stage.label());
    }
    if let Some(error) = &snap.error {
        println!("error:     {error}");
    }
}

async fn run_cpr(duration: Duration) -> anyhow::Result<()> {
    let bpm = metronome_bpm_from_env_value(std::env::var("CARDIOSIM_METRONOME_BPM").ok())?;
    let cfg = PoseConfig::default().with_metronome_bpm(bpm)?;
    let camera = Arc::new(SyntheticCamera::new(
        Some(CanvasSize::new(640, 480)),
        DEFAULT_FRAME_INTERVAL,
    ));
    let pipeline = PosePipeline::new(
        cfg.clone(),
        camera,
        Arc::new(ScriptedModel::demo(Duration::from_millis(8))),
        RecordingCanvas::new(cfg.fallback_canvas()),
    );
    let mut coach = CprCoach::new(pipeline, Metronome::new(cfg.metronome_bpm()));

    coach.go_to(COMPRESSION_STEP).await?;
    println!("{}", coach.step().instruction);
    coach.start_camera().await?;

    let mut beats = coach.metronome().subscribe();
    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            changed = beats.changed() => {
                if changed.is_err() {
                    break;
                }
                if *beats.borrow_and_update() {
                    let count = coach.record_compression();
                    println!("  push {:>3}  {}", count.total, coach.body_status());
                    if count.breaths_due {
                        println!("  2 rescue breaths");
                    }
                }
            }
        }
    }

    coach.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_filter_covers_every_workspace_crate() {
        let filter = log_filter().expect("directives parse").to_string();
        for target in ["cardiosim_run", "cardiosim_core", "cardiosim_pose", "api_client"] {
            assert!(filter.contains(&format!("{target}=info")), "{filter}");
        }
    }
}
