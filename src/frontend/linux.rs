//! # Linux DVB Frontend
//!
//! [`FrontendIo`] over the Linux DVB API (`linux/dvb/frontend.h`).
//!
//! The SEC ioctls are synchronous in the driver: each returns once the
//! voltage, tone or bus message has been applied.

use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;
use std::time::Duration;
use tracing::{debug, info};

use super::io_trait::FrontendIo;
use crate::diseqc::protocol::{BurstSelector, CommandFrame, ReplyFrame, ToneMode, Voltage, REPLY_MAX_LEN};
use crate::error::Result;

/// `_IOW('o', 63, struct dvb_diseqc_master_cmd)`
const FE_DISEQC_SEND_MASTER_CMD: libc::c_ulong = 0x4007_6F3F;
/// `_IOR('o', 64, struct dvb_diseqc_slave_reply)`
const FE_DISEQC_RECV_SLAVE_REPLY: libc::c_ulong = 0x800C_6F40;
/// `_IO('o', 65)`
const FE_DISEQC_SEND_BURST: libc::c_ulong = 0x6F41;
/// `_IO('o', 66)`
const FE_SET_TONE: libc::c_ulong = 0x6F42;
/// `_IO('o', 67)`
const FE_SET_VOLTAGE: libc::c_ulong = 0x6F43;

const SEC_TONE_ON: libc::c_ulong = 0;
const SEC_TONE_OFF: libc::c_ulong = 1;
const SEC_VOLTAGE_13: libc::c_ulong = 0;
const SEC_VOLTAGE_18: libc::c_ulong = 1;
const SEC_MINI_A: libc::c_ulong = 0;
const SEC_MINI_B: libc::c_ulong = 1;

/// `struct dvb_diseqc_master_cmd`
#[repr(C)]
struct DvbDiseqcMasterCmd {
    msg: [u8; 6],
    msg_len: u8,
}

/// `struct dvb_diseqc_slave_reply`
#[repr(C)]
struct DvbDiseqcSlaveReply {
    msg: [u8; REPLY_MAX_LEN],
    msg_len: u8,
    timeout: libc::c_int,
}

/// Path of a frontend device node
pub fn frontend_path(adapter: u32, frontend: u32) -> String {
    format!("/dev/dvb/adapter{}/frontend{}", adapter, frontend)
}

/// DVB frontend device handle
pub struct LinuxFrontend {
    file: File,
    device_path: String,
}

impl std::fmt::Debug for LinuxFrontend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinuxFrontend")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl LinuxFrontend {
    /// Open `/dev/dvb/adapterN/frontendM` read-write
    ///
    /// # Errors
    ///
    /// Returns `Io` if the device node cannot be opened
    pub fn open(adapter: u32, frontend: u32) -> Result<Self> {
        let device_path = frontend_path(adapter, frontend);
        let file = OpenOptions::new().read(true).write(true).open(&device_path)?;
        info!("Opened DVB frontend at {}", device_path);

        Ok(Self { file, device_path })
    }

    /// Get the device path of the opened frontend
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    fn ioctl_value(&self, request: libc::c_ulong, value: libc::c_ulong) -> io::Result<()> {
        // SAFETY: the fd is owned by `self.file` and the request takes its
        // argument by value.
        let rc = unsafe { libc::ioctl(self.file.as_raw_fd(), request as _, value) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn ioctl_ptr<T>(&self, request: libc::c_ulong, arg: &mut T) -> io::Result<()> {
        // SAFETY: `arg` is a live repr(C) struct matching the layout the
        // request expects.
        let rc = unsafe { libc::ioctl(self.file.as_raw_fd(), request as _, arg as *mut T) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

#[async_trait]
impl FrontendIo for LinuxFrontend {
    async fn set_tone(&mut self, tone: ToneMode) -> io::Result<()> {
        debug!("FE_SET_TONE {:?}", tone);
        let value = match tone {
            ToneMode::On => SEC_TONE_ON,
            ToneMode::Off => SEC_TONE_OFF,
        };
        self.ioctl_value(FE_SET_TONE, value)
    }

    async fn set_voltage(&mut self, voltage: Voltage) -> io::Result<()> {
        debug!("FE_SET_VOLTAGE {:?}", voltage);
        let value = match voltage {
            Voltage::V13 => SEC_VOLTAGE_13,
            Voltage::V18 => SEC_VOLTAGE_18,
        };
        self.ioctl_value(FE_SET_VOLTAGE, value)
    }

    async fn send_master_cmd(&mut self, frame: &CommandFrame) -> io::Result<()> {
        let mut cmd = DvbDiseqcMasterCmd {
            msg: *frame.raw(),
            msg_len: frame.len() as u8,
        };
        self.ioctl_ptr(FE_DISEQC_SEND_MASTER_CMD, &mut cmd)
    }

    async fn send_burst(&mut self, burst: BurstSelector) -> io::Result<()> {
        debug!("FE_DISEQC_SEND_BURST {:?}", burst);
        let value = match burst {
            BurstSelector::A => SEC_MINI_A,
            BurstSelector::B => SEC_MINI_B,
        };
        self.ioctl_value(FE_DISEQC_SEND_BURST, value)
    }

    async fn recv_slave_reply(&mut self, timeout: Duration) -> io::Result<ReplyFrame> {
        let mut reply = DvbDiseqcSlaveReply {
            msg: [0; REPLY_MAX_LEN],
            msg_len: 0,
            timeout: timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int,
        };
        self.ioctl_ptr(FE_DISEQC_RECV_SLAVE_REPLY, &mut reply)?;

        let len = (reply.msg_len as usize).min(REPLY_MAX_LEN);
        Ok(ReplyFrame::new(&reply.msg[..len]))
    }
}
