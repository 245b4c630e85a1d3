use iron_model::MetricSample;
use sysinfo::{Pid, System};

use crate::ExecError;

/// Names of the counters a [`SysinfoReader`] reports.
pub const CPU_PERCENT: &str = "cpu.percent";
pub const MEM_RSS_BYTES: &str = "mem.rss.bytes";
pub const MEM_VIRTUAL_BYTES: &str = "mem.virtual.bytes";
pub const IO_READ_BYTES: &str = "io.read.bytes";
pub const IO_WRITE_BYTES: &str = "io.write.bytes";
pub const IO_READ_TOTAL_BYTES: &str = "io.read.total.bytes";
pub const IO_WRITE_TOTAL_BYTES: &str = "io.write.total.bytes";

/// Source of resource counters for one process.
pub trait ProcessReader: Send + 'static {
    fn sample(&mut self, pid: u32) -> Result<MetricSample, ExecError>;
}

/// Reads counters from the OS process table.
///
/// CPU usage is relative to the previous refresh, so the first sample reports 0.
pub struct SysinfoReader {
    system: System,
}

impl SysinfoReader {
    pub fn new() -> Self {
        Self { system: System::new() }
    }
}

impl Default for SysinfoReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessReader for SysinfoReader {
    fn sample(&mut self, pid: u32) -> Result<MetricSample, ExecError> {
        let spid = Pid::from_u32(pid);
        if !self.system.refresh_process(spid) {
            return Err(ExecError::ProcessGone(pid));
        }
        let proc = self.system.process(spid).ok_or(ExecError::ProcessGone(pid))?;
        let disk = proc.disk_usage();

        Ok(MetricSample::new(pid)
            .with(CPU_PERCENT, f64::from(proc.cpu_usage()))
            .with(MEM_RSS_BYTES, proc.memory() as f64)
            .with(MEM_VIRTUAL_BYTES, proc.virtual_memory() as f64)
            .with(IO_READ_BYTES, disk.read_bytes as f64)
            .with(IO_WRITE_BYTES, disk.written_bytes as f64)
            .with(IO_READ_TOTAL_BYTES, disk.total_read_bytes as f64)
            .with(IO_WRITE_TOTAL_BYTES, disk.total_written_bytes as f64))
    }
}
