use crate::command::PidParameters;
use crate::link::{Link, LinkError};
use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

/// PWM ceiling of the controller output stage.
const MAX_DUTY: f64 = 255.0;

#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Wall-clock pause before each telemetry frame.
    pub frame_interval: Duration,
    /// How long an idle read blocks before reporting a timeout.
    pub idle_timeout: Duration,
    /// Device time advanced per frame, in seconds.
    pub step_s: f64,
    /// Speed reached at full duty.
    pub max_rpm: f64,
    pub time_constant_s: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_millis(100),
            idle_timeout: Duration::from_millis(100),
            step_s: 0.1,
            max_rpm: 3000.0,
            time_constant_s: 0.3,
        }
    }
}

impl SimConfig {
    /// No wall-clock pauses; frames are produced as fast as they are read.
    pub fn unpaced() -> Self {
        Self {
            frame_interval: Duration::ZERO,
            idle_timeout: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// In-process stand-in for the motor controller firmware.
///
/// Understands the console's command set, answers with free-form status
/// lines and streams `DATA:` frames while the motor runs. Speed follows a
/// discrete PID with a first-order motor response.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    config: SimConfig,
    gains: PidParameters,
    setpoint: f64,
    rpm: f64,
    integral: f64,
    previous_error: f64,
    output: f64,
    running: bool,
    elapsed_s: f64,
    outbox: VecDeque<String>,
}

impl SimulatedDevice {
    pub fn new(config: SimConfig) -> Self {
        let mut device = Self {
            config,
            gains: PidParameters::default(),
            setpoint: 0.0,
            rpm: 0.0,
            integral: 0.0,
            previous_error: 0.0,
            output: 0.0,
            running: false,
            elapsed_s: 0.0,
            outbox: VecDeque::new(),
        };
        device.reply("System ready.".to_string());
        device
    }

    pub fn rpm(&self) -> f64 {
        self.rpm
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn gains(&self) -> PidParameters {
        self.gains
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Advances the controller and motor model by `dt_s` seconds.
    pub fn step(&mut self, dt_s: f64) {
        let error = self.setpoint - self.rpm;
        self.integral += error * dt_s;
        let derivative = if dt_s > 0.0 {
            (error - self.previous_error) / dt_s
        } else {
            0.0
        };
        self.previous_error = error;

        let raw = self.gains.kp() * error + self.gains.ki() * self.integral
            + self.gains.kd() * derivative;
        self.output = raw.clamp(0.0, MAX_DUTY);

        let target = if self.running {
            self.output / MAX_DUTY * self.config.max_rpm
        } else {
            0.0
        };
        let alpha = 1.0 - (-dt_s / self.config.time_constant_s).exp();
        self.rpm += (target - self.rpm) * alpha;
        self.elapsed_s += dt_s;
    }

    fn reply(&mut self, line: String) {
        self.outbox.push_back(line);
    }

    fn start(&mut self, setpoint: f64, label: &str) {
        if setpoint < 0.0 {
            return;
        }
        self.setpoint = setpoint;
        self.running = true;
        self.reply(format!("Motor {label}, setpoint: {setpoint:.2}"));
    }

    fn stop(&mut self) {
        self.running = false;
        self.output = 0.0;
        self.integral = 0.0;
        self.previous_error = 0.0;
        self.reply("Motor stopped.".to_string());
    }

    fn apply_pid(&mut self, fields: &str) {
        let parsed: Vec<f64> = fields
            .split(',')
            .filter_map(|f| f.trim().parse::<f64>().ok())
            .collect();
        let gains = match parsed.as_slice() {
            [kp, ki, kd] => PidParameters::new(*kp, *ki, *kd).ok(),
            _ => None,
        };
        match gains {
            Some(gains) => {
                self.gains = gains;
                self.reply(format!(
                    "PID updated: kp={:.2} ki={:.2} kd={:.2}",
                    gains.kp(),
                    gains.ki(),
                    gains.kd()
                ));
            }
            None => self.reply("Invalid PID command.".to_string()),
        }
    }

    fn handle(&mut self, line: &str) {
        let command = line.trim().to_ascii_uppercase();
        if command == "STOP" {
            self.stop();
        } else if let Some(fields) = command.strip_prefix("PID,") {
            self.apply_pid(fields);
        } else if let Some(rest) = command.strip_prefix('F') {
            self.start(rest.trim().parse().unwrap_or(0.0), "forward");
        } else if let Some(rest) = command.strip_prefix('R') {
            self.start(rest.trim().parse().unwrap_or(0.0), "reverse");
        } else {
            self.reply("Unknown command.".to_string());
        }
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl Link for SimulatedDevice {
    fn write_line(&mut self, line: &str) -> Result<(), LinkError> {
        self.handle(line);
        Ok(())
    }

    fn read_line(&mut self) -> Result<Option<String>, LinkError> {
        if let Some(line) = self.outbox.pop_front() {
            return Ok(Some(line));
        }
        if !self.running {
            if !self.config.idle_timeout.is_zero() {
                thread::sleep(self.config.idle_timeout);
            }
            return Ok(None);
        }
        if !self.config.frame_interval.is_zero() {
            thread::sleep(self.config.frame_interval);
        }
        self.step(self.config.step_s);
        Ok(Some(format!(
            "DATA:{:.2},{:.2},{:.2}",
            self.elapsed_s, self.rpm, self.setpoint
        )))
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
