//! Diagnostics accumulated over one parse.

/// Vehicle classification detected from parameter names in PARM records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VehicleKind {
    /// No matching parameter seen yet.
    #[default]
    Generic,
    Quadrotor,
    FixedWing,
    GroundRover,
}

/// One recorded corruption incident.
#[derive(Debug, Clone)]
pub struct ParseIncident {
    /// Value of the message counter when the incident was recorded.
    pub message_index: u64,
    /// Human-readable description.
    pub message: String,
}

/// Result of a whole parse: row counts, corruption incidents, resync byte
/// count and the detected vehicle kind.
#[derive(Debug, Clone, Default)]
pub struct ParseStatus {
    valid_rows: u64,
    fmt_incidents: Vec<ParseIncident>,
    data_incidents: Vec<ParseIncident>,
    time_incidents: Vec<ParseIncident>,
    no_message_bytes: u64,
    vehicle: VehicleKind,
}

impl ParseStatus {
    /// Rows successfully emitted into the sink.
    pub fn valid_rows(&self) -> u64 {
        self.valid_rows
    }

    /// Duplicate or malformed FMT records.
    pub fn corrupt_fmt_count(&self) -> u64 {
        self.fmt_incidents.len() as u64
    }

    /// Unknown type codes, NaN floats and unknown format characters.
    pub fn corrupt_data_count(&self) -> u64 {
        self.data_incidents.len() as u64
    }

    /// Non-monotonic timestamp occurrences.
    pub fn corrupt_time_count(&self) -> u64 {
        self.time_incidents.len() as u64
    }

    /// Bytes discarded while searching for the next valid header.
    pub fn no_message_bytes(&self) -> u64 {
        self.no_message_bytes
    }

    pub fn vehicle(&self) -> VehicleKind {
        self.vehicle
    }

    pub fn fmt_incidents(&self) -> &[ParseIncident] {
        &self.fmt_incidents
    }

    pub fn data_incidents(&self) -> &[ParseIncident] {
        &self.data_incidents
    }

    pub fn time_incidents(&self) -> &[ParseIncident] {
        &self.time_incidents
    }

    pub(crate) fn valid_row(&mut self) {
        self.valid_rows += 1;
    }

    pub(crate) fn corrupt_fmt(&mut self, message_index: u64, message: String) {
        self.fmt_incidents.push(ParseIncident {
            message_index,
            message,
        });
    }

    pub(crate) fn corrupt_data(&mut self, message_index: u64, message: String) {
        self.data_incidents.push(ParseIncident {
            message_index,
            message,
        });
    }

    pub(crate) fn corrupt_time(&mut self, message_index: u64, message: String) {
        self.time_incidents.push(ParseIncident {
            message_index,
            message,
        });
    }

    pub(crate) fn set_no_message_bytes(&mut self, count: u64) {
        self.no_message_bytes = count;
    }

    pub(crate) fn set_vehicle(&mut self, kind: VehicleKind) {
        self.vehicle = kind;
    }
}
