use api_client::HttpBackend;
use cardiosim_core::config::{
    analysis_mode_from_env_value, backend_url_from_env_value, scenarios_path_from_env_value,
};
use cardiosim_core::{
    check_backend, AnalysisMode, AnalysisOutcome, Audience, CoreConfig, EmergencyOutcome,
    ExplanationOutcome, MentorOutcome, ProcedureStage, ScenarioCatalogue, Session,
    VideoProcedure,
};
use cardiosim_pose::synthetic::{ScriptedModel, SyntheticCamera, DEFAULT_FRAME_INTERVAL};
use cardiosim_pose::{
    metronome_bpm_from_env_value, BodyStatus, Canvas, CanvasSize, CprCoach, Metronome,
    PoseConfig, PosePipeline, RecordingCanvas, COMPRESSION_STEP,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "cardiosim")]
#[command(about = "CardioSim cardiac diagnosis simulator CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the preset clinical scenarios
    Scenarios,
    /// Analyze a scenario and print the diagnosis
    Analyze {
        /// Scenario id, e.g. stemi_lad
        id: String,
        /// Send the scenario input to the backend instead of using its canned diagnosis
        #[arg(long)]
        live: bool,
    },
    /// Analyze a scenario, then explain the diagnosis
    Explain {
        /// Scenario id
        id: String,
        /// patient or clinician
        #[arg(long, default_value = "patient")]
        audience: Audience,
        #[arg(long)]
        live: bool,
    },
    /// Analyze a scenario and fetch emergency guidance if it is critical
    Emergency {
        /// Scenario id
        id: String,
        #[arg(long)]
        live: bool,
        /// Camera frame of the patient to send for visual assessment
        #[arg(long)]
        image: Option<PathBuf>,
        /// Content type of the image
        #[arg(long, default_value = "image/jpeg")]
        mime: String,
    },
    /// Ask the procedure mentor about a stent procedure stage
    Mentor {
        /// Scenario id
        id: String,
        /// blocked, guide, balloon, stent or flow
        #[arg(long, default_value = "blocked")]
        stage: ProcedureStage,
        /// Follow-up question about the stage
        #[arg(long)]
        question: Option<String>,
        #[arg(long)]
        live: bool,
    },
    /// Request a procedure training video (STEMI, CPR or PCI_BALLOON)
    Video {
        procedure: VideoProcedure,
        /// Scenario whose diagnosis sets the urgency
        #[arg(long)]
        id: Option<String>,
    },
    /// Play the stent procedure timeline for a scenario
    Simulate {
        /// Scenario id
        id: String,
    },
    /// Query the backend health once and print its mode
    Health,
    /// Print the backend contract as OpenAPI JSON
    Contract,
    /// Run the CPR compression guide against a synthetic camera
    CprDemo {
        /// Number of camera frames to process
        #[arg(long, default_value_t = 60)]
        frames: u64,
    },
}

struct Env {
    cfg: CoreConfig,
    backend: Arc<HttpBackend>,
}

fn load_env(force_live: bool) -> CliResult<Env> {
    let mode = if force_live {
        AnalysisMode::Live
    } else {
        analysis_mode_from_env_value(std::env::var("CARDIOSIM_MODE").ok())?
    };
    let url = backend_url_from_env_value(std::env::var("CARDIOSIM_BACKEND_URL").ok());
    let scenarios = scenarios_path_from_env_value(std::env::var("CARDIOSIM_SCENARIOS").ok())?;

    let cfg = CoreConfig::new(url, mode)?.with_scenarios_path(scenarios);
    let backend = Arc::new(HttpBackend::new(&cfg)?);
    Ok(Env { cfg, backend })
}

fn session(env: &Env) -> CliResult<Session> {
    let catalogue = Arc::new(ScenarioCatalogue::from_config(&env.cfg)?);
    Ok(Session::new(env.cfg.clone(), catalogue, env.backend.clone()))
}

/// Load a scenario and analyze it, printing the diagnosis.
async fn diagnose(session: &Session, id: &str) -> CliResult<bool> {
    let scenario = session.load_scenario(id)?;
    println!("{} ({})", scenario.label, scenario.real_world.patient_name);
    println!("Analyzing...");

    match session.analyze_form().await? {
        AnalysisOutcome::Diagnosed(d) => {
            println!();
            println!("[{}] {}", d.urgency.badge(), d.diagnosis);
            println!("  Artery:       {} ({})", d.artery.label(), d.artery);
            println!("  Region:       {}", d.affected_region);
            println!("  Intervention: {}", d.recommended_intervention);
            println!("  Confidence:   {:.0}%", d.confidence.get() * 100.0);
            println!("  Reasoning:    {}", d.reasoning);
            if let Some(meta) = session.snapshot().metadata {
                let source = if meta.mock { "mock" } else { "model" };
                println!(
                    "  Inference:    {} {} in {:.2}s at {}",
                    source,
                    meta.model_id.as_deref().unwrap_or("-"),
                    meta.inference_time_s,
                    meta.timestamp.to_rfc3339()
                );
            }
            Ok(true)
        }
        AnalysisOutcome::Failed(message) => {
            eprintln!("Analysis failed: {}", message);
            Ok(false)
        }
        AnalysisOutcome::Superseded => Ok(false),
    }
}

async fn explain(session: &Session, audience: Audience) -> CliResult<()> {
    println!();
    println!("Explanation ({}):", audience);

    let task = tokio::spawn({
        let session = session.clone();
        async move { session.explain(audience).await }
    });

    let mut shown = 0;
    let delay = session.config().explanation_word_delay().max(Duration::from_millis(10));
    while !task.is_finished() {
        tokio::time::sleep(delay).await;
        if let Some(explanation) = session.snapshot().explanation {
            if explanation.text.len() > shown {
                print!("{}", &explanation.text[shown..]);
                shown = explanation.text.len();
            }
        }
    }

    match task.await?? {
        ExplanationOutcome::Complete(text) => {
            if text.len() > shown {
                print!("{}", &text[shown..]);
            }
            println!();
        }
        ExplanationOutcome::Failed(message) => eprintln!("\nExplanation failed: {}", message),
        ExplanationOutcome::Superseded => println!(),
    }
    Ok(())
}

async fn mentor(
    session: &Session,
    stage: ProcedureStage,
    question: Option<&str>,
) -> CliResult<()> {
    println!();
    println!("Mentor ({}):", stage.label());
    if let MentorOutcome::Guidance(g) = session.mentor_guidance(stage, None).await? {
        println!("{}", g.guidance);
        for check in &g.safety_checks {
            println!("  [ ] {}", check);
        }
    }
    if let Some(question) = question {
        if let MentorOutcome::Answer(a) = session.mentor_guidance(stage, Some(question)).await? {
            println!();
            println!("Q: {}", a.question);
            println!("A: {}", a.answer);
        }
    }
    Ok(())
}

async fn video(session: &Session, procedure: VideoProcedure) -> CliResult<()> {
    let video = session.procedure_video(procedure).await?;
    println!("{} video: {} ({}s)", procedure, video.status, video.duration.as_secs());
    println!("  {}", video.description);
    match &video.video_url {
        Some(url) => println!("  {}", url),
        None => {
            for (i, frame) in video.frames.iter().enumerate() {
                println!("  {:>2}. {}", i + 1, frame);
            }
        }
    }
    Ok(())
}

async fn simulate(session: &Session) -> CliResult<()> {
    session.start_simulation()?;
    let mut last = None;
    loop {
        let Some(stage) = session.snapshot().simulation_stage else {
            break;
        };
        if last != Some(stage) {
            println!("  {:<22} {}", stage.label(), stage.description());
            last = Some(stage);
        }
        if stage.is_final() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    session.stop_simulation();
    Ok(())
}

async fn cpr_demo(frames: u64) -> CliResult<()> {
    let bpm = metronome_bpm_from_env_value(std::env::var("CARDIOSIM_METRONOME_BPM").ok())?;
    let cfg = PoseConfig::default().with_metronome_bpm(bpm)?;
    let camera = Arc::new(
        SyntheticCamera::new(Some(CanvasSize::new(640, 480)), DEFAULT_FRAME_INTERVAL)
            .with_frame_limit(frames),
    );
    let model = Arc::new(ScriptedModel::demo(Duration::from_millis(8)));
    let pipeline = PosePipeline::new(
        cfg.clone(),
        camera,
        model,
        RecordingCanvas::new(cfg.fallback_canvas()),
    );
    let mut coach = CprCoach::new(pipeline, Metronome::new(cfg.metronome_bpm()));

    coach.go_to(COMPRESSION_STEP).await?;
    let step = coach.step();
    println!("Step {}: {}", step.number, step.title);
    println!("  {}", step.instruction);

    coach.start_camera().await?;
    let mut targets = coach.pipeline().subscribe_target();
    let mut beats = coach.metronome().subscribe();
    let mut last_status = String::new();
    let mut compressions = 0;

    loop {
        tokio::select! {
            changed = targets.changed() => {
                if changed.is_err() || !coach.pipeline().state().is_on() {
                    break;
                }
                let status = match coach.body_status() {
                    BodyStatus::Detected(t) => format!("{} at ({:.0}, {:.0})", coach.body_status(), t.x, t.y),
                    other => other.to_string(),
                };
                if status != last_status {
                    println!("  {}", status);
                    last_status = status;
                }
            }
            changed = beats.changed() => {
                if changed.is_err() {
                    break;
                }
                if *beats.borrow_and_update() {
                    let count = coach.record_compression();
                    compressions = count.total;
                    if count.breaths_due {
                        println!("  {} compressions: give 2 rescue breaths now", count.total);
                    }
                }
            }
            _ = tokio::time::sleep(Duration::from_millis(500)) => {
                if !coach.pipeline().state().is_on() {
                    break;
                }
            }
        }
    }

    println!("Camera: {:?}", coach.pipeline().state());
    println!("Compressions paced: {}", compressions);
    coach.pipeline().with_canvas(|canvas| {
        println!("Last overlay ({}):", canvas.size());
        for command in canvas.commands() {
            println!("  {}", command);
        }
    });
    coach.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> CliResult<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cardiosim_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Scenarios) => {
            let env = load_env(false)?;
            let catalogue = ScenarioCatalogue::from_config(&env.cfg)?;
            for scenario in catalogue.iter() {
                let d = &scenario.mock_diagnosis;
                println!(
                    "{:<12} {:<40} {} / {}",
                    scenario.id(),
                    scenario.label,
                    d.artery,
                    d.urgency
                );
            }
        }
        Some(Commands::Analyze { id, live }) => {
            let env = load_env(live)?;
            let session = session(&env)?;
            if diagnose(&session, &id).await? && session.snapshot().emergency_guidance_visible() {
                println!();
                println!("CRITICAL: run `cardiosim emergency {}` for guidance.", id);
            }
        }
        Some(Commands::Explain { id, audience, live }) => {
            let env = load_env(live)?;
            let session = session(&env)?;
            if diagnose(&session, &id).await? {
                explain(&session, audience).await?;
            }
        }
        Some(Commands::Emergency {
            id,
            live,
            image,
            mime,
        }) => {
            let env = load_env(live)?;
            let session = session(&env)?;
            if diagnose(&session, &id).await? {
                println!();
                match session.emergency_guidance().await {
                    EmergencyOutcome::Guidance(g) => {
                        println!("EMERGENCY PROTOCOL ({})", g.ai_provider);
                        println!("{}", g.protocol);
                        for (i, step) in g.visual_steps.iter().enumerate() {
                            println!("  [ ] {}. {}", i + 1, step);
                        }
                        println!("0 of {} steps completed", g.visual_steps.len());
                    }
                    EmergencyOutcome::NotRequired => {
                        println!("No emergency guidance required for this urgency.")
                    }
                    EmergencyOutcome::Superseded => {}
                }
                if let Some(path) = image {
                    let bytes = std::fs::read(&path)?;
                    let g = session.analyze_emergency_image(&bytes, &mime).await?;
                    println!();
                    let confidence = g.confidence.get() * 100.0;
                    println!("Image assessment ({:.0}% confidence):", confidence);
                    println!("  {}", g.guidance);
                    println!("  Next: {}", g.next_step);
                }
            }
        }
        Some(Commands::Mentor {
            id,
            stage,
            question,
            live,
        }) => {
            let env = load_env(live)?;
            let session = session(&env)?;
            if diagnose(&session, &id).await? {
                mentor(&session, stage, question.as_deref()).await?;
            }
        }
        Some(Commands::Video { procedure, id }) => {
            let env = load_env(false)?;
            let session = session(&env)?;
            if let Some(id) = id {
                if !diagnose(&session, &id).await? {
                    return Ok(());
                }
                println!();
            }
            video(&session, procedure).await?;
        }
        Some(Commands::Simulate { id }) => {
            let env = load_env(false)?;
            let session = session(&env)?;
            if diagnose(&session, &id).await? {
                println!();
                println!("Procedure ({} stages):", ProcedureStage::ALL.len());
                simulate(&session).await?;
            }
        }
        Some(Commands::Health) => {
            let env = load_env(false)?;
            let mode = check_backend(env.backend.as_ref(), env.cfg.health_timeout()).await;
            println!("{}: {}", env.backend.base_url(), mode);
        }
        Some(Commands::Contract) => {
            println!("{}", api_shared::contract_json()?);
        }
        Some(Commands::CprDemo { frames }) => {
            cpr_demo(frames).await?;
        }
        None => {
            println!("No command given. Use --help for usage.");
        }
    }

    Ok(())
}
