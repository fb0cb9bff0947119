//! Bowling Lane entry point
//!
//! Runs a headless session on the sandbox host: each roll jitters the camera
//! heading, launches, lets the ball run out, then re-racks.
//!
//! Usage: `bowling-lane [settings.json]`

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use bowling_lane::consts::MAX_SUBSTEPS;
use bowling_lane::host::Transforms;
use bowling_lane::sandbox::{Sandbox, lane_scene};
use bowling_lane::sim::{Lane, LaneInput};
use bowling_lane::{ConfigError, LaneSettings};

/// Session runner holding the host, the lane and the step accumulator
struct Session {
    host: Sandbox,
    lane: Lane,
    accumulator: f32,
    rng: Pcg32,
}

impl Session {
    fn new(settings: LaneSettings) -> Result<Self, ConfigError> {
        let rng = Pcg32::seed_from_u64(settings.seed);
        let (mut host, handles) = lane_scene(&settings);
        let lane = Lane::new(settings, &handles, &mut host)?;
        Ok(Self {
            host,
            lane,
            accumulator: 0.0,
            rng,
        })
    }

    /// Advance one rendered frame of `frame_dt` seconds
    fn frame(&mut self, frame_dt: f32, input: &LaneInput) {
        let dt = self.lane.settings().fixed_dt;
        self.accumulator += frame_dt.min(0.1);

        let mut substeps = 0;
        while self.accumulator >= dt && substeps < MAX_SUBSTEPS {
            let overlaps = self.host.step(dt);
            self.lane.fixed_update(&mut self.host, &overlaps, dt);
            self.accumulator -= dt;
            substeps += 1;
        }

        self.lane.update(&mut self.host, input);
        self.host.end_frame();
        self.lane.end_of_frame(&mut self.host);
    }

    /// Play one roll; returns pins knocked down
    fn roll(&mut self, index: u32) -> u64 {
        let frame_dt = self.lane.settings().fixed_dt;
        let jitter = self.lane.settings().aim_jitter;
        let yaw = if jitter > 0.0 {
            self.rng.random_range(-jitter..=jitter)
        } else {
            0.0
        };
        self.host
            .set_camera_forward(Some(Vec3::new(yaw.sin(), -0.3, yaw.cos())));

        // Let the indicator pick up the new heading, then launch
        self.frame(frame_dt, &LaneInput::default());
        let before = self.lane.score();
        self.frame(
            frame_dt,
            &LaneInput {
                launch: true,
                ..Default::default()
            },
        );

        let end_z = self.lane.settings().pin_anchor.z + 2.0;
        let max_frames = (self.lane.settings().max_roll_seconds / frame_dt).ceil() as u32;
        let ball = self.lane.ball().entity();
        for _ in 0..max_frames {
            self.frame(frame_dt, &LaneInput::default());
            if self.host.position(ball).is_some_and(|p| p.z > end_z) {
                break;
            }
        }
        let knocked = self.lane.score() - before;
        log::info!(
            "Roll {}: aim {:+.3} rad, {} pins{}",
            index + 1,
            yaw,
            knocked,
            if knocked == 0 { " (gutter)" } else { "" }
        );

        self.frame(
            frame_dt,
            &LaneInput {
                reset: true,
                ..Default::default()
            },
        );
        while !self.lane.ready_to_launch() {
            self.frame(frame_dt, &LaneInput::default());
        }
        knocked
    }
}

fn main() {
    env_logger::init();
    log::info!("Bowling Lane (headless) starting...");

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| LaneSettings::DEFAULT_PATH.to_string());
    let settings = LaneSettings::load_or_default(&path);
    let rolls = settings.rolls;

    let mut session = match Session::new(settings) {
        Ok(session) => session,
        Err(e) => {
            log::error!("Lane setup failed: {e}");
            std::process::exit(1);
        }
    };

    for i in 0..rolls {
        session.roll(i);
        if session.lane.coordinator().pin_set().is_none() {
            log::error!("Pin reset failed; stopping session");
            break;
        }
    }

    println!("{}", session.lane.coordinator().score_text());
}
