/// Naming of one telemetry channel across logs, metrics and the console.
#[derive(Debug, Clone, Copy)]
pub struct Tag {
    pub key: &'static str,
    pub metric: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
}

pub const DEVICE_TIME_S: Tag = Tag {
    key: "timestamp_s",
    metric: "motor_console_device_time_seconds",
    label: "t",
    unit: "s",
};

pub const MOTOR_RPM: Tag = Tag {
    key: "rpm",
    metric: "motor_console_motor_rpm",
    label: "rpm",
    unit: "rpm",
};

pub const SETPOINT_RPM: Tag = Tag {
    key: "setpoint",
    metric: "motor_console_setpoint_rpm",
    label: "setpoint",
    unit: "rpm",
};

pub const WINDOW_LEN: Tag = Tag {
    key: "window_len",
    metric: "motor_console_window_samples",
    label: "samples",
    unit: "",
};

pub const LINK_OPEN: Tag = Tag {
    key: "link_open",
    metric: "motor_console_link_open",
    label: "link",
    unit: "",
};
