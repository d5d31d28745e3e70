//! Confirmation providers for the calibration prompts.

use std::io::{BufRead, Write};

use scale_hardware::SimulatedAdc;
use scale_traits::Confirmation;
use tracing::info;

/// Prints the prompt on stderr and waits for a line on stdin.
/// Anything starting with `n` declines; end of input declines too.
pub struct StdinConfirmation;

impl Confirmation for StdinConfirmation {
    fn await_confirmation(&mut self, prompt: &str) -> bool {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "{prompt} [Y/n] ");
        let _ = stderr.flush();
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => false,
            Ok(_) => !line.trim().to_ascii_lowercase().starts_with('n'),
        }
    }
}

/// `--yes` on real hardware: confirm every prompt, logging it.
pub struct AutoConfirm;

impl Confirmation for AutoConfirm {
    fn await_confirmation(&mut self, prompt: &str) -> bool {
        info!(prompt, "auto-confirmed");
        true
    }
}

/// `--yes` in simulation: acts like an operator, clearing the simulated
/// channel for "remove all weight" prompts and placing the requested weight
/// for "Place" prompts.
///
/// Prompts carry the weight rounded to 0.1 kg, so a request within 50 g of
/// `reference_g` places exactly `reference_g`.
pub struct SimOperator {
    devices: Vec<SimulatedAdc>,
    channels_per_adc: usize,
    reference_g: f32,
}

impl SimOperator {
    pub fn new(devices: Vec<SimulatedAdc>, channels_per_adc: usize, reference_g: f32) -> Self {
        Self {
            devices,
            channels_per_adc: channels_per_adc.max(1),
            reference_g,
        }
    }

    pub fn with_reference(mut self, reference_g: f32) -> Self {
        self.reference_g = reference_g;
        self
    }

    fn place(&self, slot: usize, grams: f32) {
        if let Some(adc) = self.devices.get(slot / self.channels_per_adc) {
            adc.set_load((slot % self.channels_per_adc) as u8, grams);
        }
    }
}

/// Requested load in grams from a prompt like `Place 4.0 kg on ...`.
fn prompt_grams(prompt: &str) -> Option<f32> {
    let rest = &prompt[prompt.find("Place ")? + "Place ".len()..];
    let kg: f32 = rest.split_whitespace().next()?.parse().ok()?;
    Some(kg * 1000.0)
}

/// Slot number from a prompt mentioning `scale-N`.
fn prompt_slot(prompt: &str) -> Option<usize> {
    let rest = &prompt[prompt.find("scale-")? + "scale-".len()..];
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

impl Confirmation for SimOperator {
    fn await_confirmation(&mut self, prompt: &str) -> bool {
        let Some(slot) = prompt_slot(prompt) else {
            return true;
        };
        let grams = if prompt.contains("remove all weight") {
            0.0
        } else {
            match prompt_grams(prompt) {
                Some(g) if (g - self.reference_g).abs() >= 50.0 => g,
                _ => self.reference_g,
            }
        };
        self.place(slot, grams);
        info!(prompt, slot, grams, "simulated operator");
        true
    }
}
