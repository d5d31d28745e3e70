//! Driver assembly: one boxed driver handle per configured channel slot.

use scale_config::Config;
use scale_hardware::SimulatedAdc;
use scale_traits::AdcDriver;

pub type Driver = Box<dyn AdcDriver>;

pub struct Hardware {
    /// Indexed by slot (`adc * channels_per_adc + input`).
    pub drivers: Vec<Driver>,
    /// Simulated devices, when running without hardware.
    pub sims: Vec<SimulatedAdc>,
}

impl Hardware {
    pub fn is_simulated(&self) -> bool {
        !self.sims.is_empty()
    }
}

/// Simulated converters shaped after `[device]`, loaded per `[simulation]`.
pub fn simulated(cfg: &Config) -> Hardware {
    let sim = &cfg.simulation;
    let per_adc = cfg.device.channels_per_adc;
    let mut drivers: Vec<Driver> = Vec::with_capacity(cfg.slots());
    let mut sims = Vec::with_capacity(usize::from(cfg.device.adcs));
    for adc in 0..cfg.device.adcs {
        let dev = SimulatedAdc::new(per_adc)
            .with_zero_counts(sim.zero_counts)
            .with_counts_per_gram(sim.counts_per_gram)
            .with_noise(sim.noise_counts)
            .with_seed(sim.seed.wrapping_add(u32::from(adc)))
            .with_afe(sim.afe_polls);
        for input in 0..per_adc {
            dev.set_load(input, sim.load_g);
            drivers.push(Box::new(dev.clone()));
        }
        sims.push(dev);
    }
    Hardware { drivers, sims }
}

#[cfg(not(feature = "hardware"))]
pub fn open(cfg: &Config) -> eyre::Result<Hardware> {
    Ok(simulated(cfg))
}

#[cfg(feature = "hardware")]
pub fn open(cfg: &Config) -> eyre::Result<Hardware> {
    #[cfg(target_os = "linux")]
    {
        use std::cell::RefCell;
        use std::rc::Rc;

        use eyre::WrapErr;
        use scale_hardware::nau7802::Nau7802;

        if cfg.device.adcs > 1 {
            eyre::bail!("device.adcs > 1 needs a bus multiplexer, which this build does not drive");
        }
        let dev = Nau7802::new(cfg.device.i2c_bus, cfg.device.i2c_address)
            .wrap_err("open NAU7802")?;
        let shared = Rc::new(RefCell::new(dev));
        let drivers = (0..cfg.device.channels_per_adc)
            .map(|_| Box::new(Shared(Rc::clone(&shared))) as Driver)
            .collect();
        Ok(Hardware {
            drivers,
            sims: Vec::new(),
        })
    }
    #[cfg(not(target_os = "linux"))]
    {
        tracing::warn!("hardware feature has no driver on this OS; using the simulator");
        Ok(simulated(cfg))
    }
}

/// One converter shared by the channels wired to its inputs.
#[cfg(all(feature = "hardware", target_os = "linux"))]
struct Shared<D>(std::rc::Rc<std::cell::RefCell<D>>);

#[cfg(all(feature = "hardware", target_os = "linux"))]
impl<D: AdcDriver> AdcDriver for Shared<D> {
    fn bind(&mut self) -> scale_traits::HwResult<()> {
        self.0.borrow_mut().bind()
    }
    fn channel_count(&self) -> u8 {
        self.0.borrow().channel_count()
    }
    fn select_channel(&mut self, index: u8) -> scale_traits::HwResult<()> {
        self.0.borrow_mut().select_channel(index)
    }
    fn read_raw(&mut self, timeout: std::time::Duration) -> scale_traits::HwResult<i32> {
        self.0.borrow_mut().read_raw(timeout)
    }
    fn supports_afe_calibration(&self) -> bool {
        self.0.borrow().supports_afe_calibration()
    }
    fn start_afe_calibration(&mut self) -> scale_traits::HwResult<()> {
        self.0.borrow_mut().start_afe_calibration()
    }
    fn calibration_status(&mut self) -> scale_traits::HwResult<scale_traits::AfeStatus> {
        self.0.borrow_mut().calibration_status()
    }
}
