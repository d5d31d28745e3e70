//! NAU7802 24-bit load-cell ADC over Linux I2C.
//!
//! Register map and power-up sequence follow the Nuvoton datasheet (rev 1.7):
//! reset, power digital+analog, wait for PUR, start conversion cycle, then
//! LDO / gain / rate setup. Two differential inputs are exposed as channels
//! 0 and 1 (CTRL2.CHS).
use std::time::Duration;

use rppal::i2c::I2c;
use scale_traits::{AdcDriver, AfeStatus, HwResult};
use tracing::{debug, trace};

use crate::error::{HwError, Result};
use crate::util::{sign_extend_24, wait_until_ready_with_timeout};

pub const NAU7802_ADDR: u16 = 0x2A;

const REG_PU_CTRL: u8 = 0x00;
const REG_CTRL1: u8 = 0x01;
const REG_CTRL2: u8 = 0x02;
const REG_ADCO_B2: u8 = 0x12;
const REG_ADC: u8 = 0x15;
const REG_POWER: u8 = 0x1C;

const PU_RR: u8 = 1 << 0;
const PU_PUD: u8 = 1 << 1;
const PU_PUA: u8 = 1 << 2;
const PU_PUR: u8 = 1 << 3;
const PU_CS: u8 = 1 << 4;
const PU_CR: u8 = 1 << 5;
const PU_AVDDS: u8 = 1 << 7;

const CTRL2_CALMOD_MASK: u8 = 0b0000_0011;
const CTRL2_CALS: u8 = 1 << 2;
const CTRL2_CAL_ERR: u8 = 1 << 3;
const CTRL2_CRS_MASK: u8 = 0b0111_0000;
const CTRL2_CHS: u8 = 1 << 7;

const LDO_3V3: u8 = 0b100;
const GAIN_X128: u8 = 0b111;
const RATE_10SPS: u8 = 0b000;

pub struct Nau7802 {
    i2c: I2c,
    bound: bool,
    poll: Duration,
}

impl Nau7802 {
    pub fn new(bus: u8, address: u16) -> Result<Self> {
        let mut i2c = I2c::with_bus(bus)?;
        i2c.set_slave_address(address)?;
        Ok(Self {
            i2c,
            bound: false,
            poll: Duration::from_millis(1),
        })
    }

    fn write_reg(&mut self, reg: u8, val: u8) -> Result<()> {
        self.i2c.smbus_write_byte(reg, val)?;
        Ok(())
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8> {
        Ok(self.i2c.smbus_read_byte(reg)?)
    }

    fn update_reg(&mut self, reg: u8, clear: u8, set: u8) -> Result<()> {
        let v = self.read_reg(reg)?;
        self.write_reg(reg, (v & !clear) | set)
    }

    fn power_up(&mut self) -> Result<()> {
        self.write_reg(REG_PU_CTRL, PU_RR)?;
        self.write_reg(REG_PU_CTRL, PU_PUD | PU_PUA)?;
        for _ in 0..10 {
            let pu = self.read_reg(REG_PU_CTRL)?;
            if pu & PU_PUR != 0 {
                return self.write_reg(REG_PU_CTRL, pu | PU_CS);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        Err(HwError::PowerUpFailed)
    }

    fn configure(&mut self) -> Result<()> {
        // LDO 3.3 V, internal AVDD source
        self.update_reg(REG_CTRL1, 0b0011_1000, LDO_3V3 << 3)?;
        self.update_reg(REG_PU_CTRL, 0, PU_AVDDS)?;
        self.update_reg(REG_CTRL1, 0b0000_0111, GAIN_X128)?;
        self.update_reg(REG_CTRL2, CTRL2_CRS_MASK, RATE_10SPS << 4)?;
        // clock chopper off (datasheet 9.4)
        self.write_reg(REG_ADC, 0x30)?;
        // PGA output bypass capacitor
        self.update_reg(REG_POWER, 0, 1 << 7)?;
        Ok(())
    }

    fn read_conversion(&mut self, timeout: Duration) -> Result<i32> {
        if !self.bound {
            return Err(HwError::NotBound);
        }
        let poll = self.poll;
        wait_until_ready_with_timeout(
            || Ok(self.read_reg(REG_PU_CTRL)? & PU_CR != 0),
            timeout,
            poll,
        )?;
        let mut buf = [0u8; 3];
        self.i2c.block_read(REG_ADCO_B2, &mut buf)?;
        let raw = sign_extend_24(buf);
        trace!(raw, "nau7802 raw read");
        Ok(raw)
    }
}

impl AdcDriver for Nau7802 {
    fn bind(&mut self) -> HwResult<()> {
        self.power_up()?;
        self.configure()?;
        self.bound = true;
        debug!("nau7802 bound");
        Ok(())
    }

    fn channel_count(&self) -> u8 {
        2
    }

    fn select_channel(&mut self, index: u8) -> HwResult<()> {
        let set = match index {
            0 => 0,
            1 => CTRL2_CHS,
            _ => {
                return Err(Box::new(HwError::UnsupportedChannel { index, channels: 2 }));
            }
        };
        self.update_reg(REG_CTRL2, CTRL2_CHS, set)?;
        Ok(())
    }

    fn read_raw(&mut self, timeout: Duration) -> HwResult<i32> {
        Ok(self.read_conversion(timeout)?)
    }

    fn supports_afe_calibration(&self) -> bool {
        true
    }

    fn start_afe_calibration(&mut self) -> HwResult<()> {
        // CALMOD = 00 (internal offset), then CALS starts it
        self.update_reg(REG_CTRL2, CTRL2_CALMOD_MASK, 0)?;
        self.update_reg(REG_CTRL2, 0, CTRL2_CALS)?;
        Ok(())
    }

    fn calibration_status(&mut self) -> HwResult<AfeStatus> {
        let ctrl2 = self.read_reg(REG_CTRL2)?;
        let status = if ctrl2 & CTRL2_CALS != 0 {
            AfeStatus::InProgress
        } else if ctrl2 & CTRL2_CAL_ERR != 0 {
            AfeStatus::Failed
        } else {
            AfeStatus::Ok
        };
        Ok(status)
    }
}
