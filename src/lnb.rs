//! # LNB Parameters
//!
//! Local oscillator frequencies of the dish's low-noise block and the
//! band/polarization decisions derived from them.
//!
//! All frequencies are in kHz, as carried by DVB transponder descriptors.

/// Transponder polarization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarization {
    Horizontal,
    Vertical,
    CircularLeft,
    CircularRight,
}

impl Polarization {
    /// Parse the usual single-letter form (`h`, `v`, `l`, `r`)
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_lowercase() {
            'h' => Some(Polarization::Horizontal),
            'v' => Some(Polarization::Vertical),
            'l' => Some(Polarization::CircularLeft),
            'r' => Some(Polarization::CircularRight),
            _ => None,
        }
    }

    /// Switch supply voltage: 13 V for vertical, 18 V for everything else
    pub fn uses_18v(&self) -> bool {
        *self != Polarization::Vertical
    }

    pub fn is_horizontal(&self) -> bool {
        *self == Polarization::Horizontal
    }
}

/// Satellite transponder to tune
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transponder {
    /// Downlink frequency in kHz
    pub frequency_khz: u32,
    pub polarization: Polarization,
}

impl Transponder {
    pub fn new(frequency_khz: u32, polarization: Polarization) -> Self {
        Self {
            frequency_khz,
            polarization,
        }
    }

    /// Transponder from a MHz frequency, `None` if it does not fit in kHz
    pub fn from_mhz(frequency_mhz: u32, polarization: Polarization) -> Option<Self> {
        mhz_to_khz(frequency_mhz).map(|khz| Self::new(khz, polarization))
    }
}

/// Convert MHz to kHz, `None` on overflow
pub const fn mhz_to_khz(mhz: u32) -> Option<u32> {
    mhz.checked_mul(1000)
}

/// LNB local oscillator parameters, kHz
///
/// A zero `high_khz` means a single-oscillator LNB. A zero `switch_khz` with a
/// non-zero `high_khz` is a multipoint LNB where polarization picks the
/// oscillator instead of the 22 kHz tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LnbParams {
    pub low_khz: u32,
    pub high_khz: u32,
    pub switch_khz: u32,
}

impl LnbParams {
    /// Europe universal Ku-band LNB (9750/10600 MHz, switch at 11700 MHz)
    pub const UNIVERSAL: LnbParams = LnbParams::new(9_750_000, 10_600_000, 11_700_000);
    /// Expanded-range DBS LNB (11250 MHz)
    pub const DBS: LnbParams = LnbParams::new(11_250_000, 0, 0);
    /// Standard single-oscillator LNB (10000 MHz)
    pub const STANDARD: LnbParams = LnbParams::new(10_000_000, 0, 0);
    /// Astra enhanced LNB (9750 MHz)
    pub const ENHANCED: LnbParams = LnbParams::new(9_750_000, 0, 0);
    /// C-band LNB (5150 MHz)
    pub const C_BAND: LnbParams = LnbParams::new(5_150_000, 0, 0);
    /// C-band multipoint LNB (5150/5750 MHz, oscillator by polarization)
    pub const C_MULTI: LnbParams = LnbParams::new(5_150_000, 5_750_000, 0);

    pub const fn new(low_khz: u32, high_khz: u32, switch_khz: u32) -> Self {
        Self {
            low_khz,
            high_khz,
            switch_khz,
        }
    }

    /// Look up a preset by name
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "universal" => Some(Self::UNIVERSAL),
            "dbs" => Some(Self::DBS),
            "standard" => Some(Self::STANDARD),
            "enhanced" => Some(Self::ENHANCED),
            "c-band" => Some(Self::C_BAND),
            "c-multi" => Some(Self::C_MULTI),
            _ => None,
        }
    }

    /// True if the LNB switches bands with the 22 kHz tone
    pub fn has_band_switch(&self) -> bool {
        self.high_khz > 0 && self.switch_khz > 0
    }

    /// High band is used when a high oscillator exists and the frequency
    /// reaches the switch threshold
    pub fn is_hiband(&self, frequency_khz: u32) -> bool {
        self.high_khz > 0 && frequency_khz >= self.switch_khz
    }

    /// Tone setting for a transponder: on only when the LNB has a tone-switched
    /// high band and the frequency falls in it
    pub fn tone_hiband(&self, frequency_khz: u32) -> bool {
        self.has_band_switch() && self.is_hiband(frequency_khz)
    }

    /// Oscillator frequency for the selected band
    pub fn local_oscillator(&self, hiband: bool) -> u32 {
        if hiband {
            self.high_khz
        } else {
            self.low_khz
        }
    }

    /// Intermediate frequency the receiver tunes to without channel routing, kHz
    pub fn intermediate_frequency_khz(&self, transponder: &Transponder) -> u32 {
        let oscillator = if self.has_band_switch() {
            self.local_oscillator(self.is_hiband(transponder.frequency_khz))
        } else if self.high_khz > 0 {
            // Multipoint: vertical on the low oscillator
            self.local_oscillator(transponder.polarization != Polarization::Vertical)
        } else {
            self.low_khz
        };
        transponder.frequency_khz.abs_diff(oscillator)
    }
}

impl Default for LnbParams {
    fn default() -> Self {
        Self::UNIVERSAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarization_letters() {
        assert_eq!(Polarization::from_letter('h'), Some(Polarization::Horizontal));
        assert_eq!(Polarization::from_letter('V'), Some(Polarization::Vertical));
        assert_eq!(Polarization::from_letter('l'), Some(Polarization::CircularLeft));
        assert_eq!(Polarization::from_letter('r'), Some(Polarization::CircularRight));
        assert_eq!(Polarization::from_letter('x'), None);
    }

    #[test]
    fn test_polarization_voltage() {
        assert!(!Polarization::Vertical.uses_18v());
        assert!(Polarization::Horizontal.uses_18v());
        assert!(Polarization::CircularLeft.uses_18v());
        assert!(Polarization::Horizontal.is_horizontal());
        assert!(!Polarization::CircularRight.is_horizontal());
    }

    #[test]
    fn test_universal_band_selection() {
        let lnb = LnbParams::UNIVERSAL;
        assert!(lnb.has_band_switch());
        assert!(!lnb.is_hiband(11_494_000));
        assert!(lnb.is_hiband(11_700_000));
        assert!(lnb.is_hiband(12_603_000));
        assert_eq!(lnb.local_oscillator(false), 9_750_000);
        assert_eq!(lnb.local_oscillator(true), 10_600_000);
    }

    #[test]
    fn test_multipoint_never_sets_tone() {
        // Always in the "high band" by frequency, but no 22 kHz switching
        assert!(LnbParams::C_MULTI.is_hiband(3_700_000));
        assert!(!LnbParams::C_MULTI.tone_hiband(3_700_000));
        assert!(LnbParams::UNIVERSAL.tone_hiband(12_603_000));
        assert!(!LnbParams::UNIVERSAL.tone_hiband(11_494_000));
    }

    #[test]
    fn test_mhz_conversion_overflow() {
        assert_eq!(mhz_to_khz(11_494), Some(11_494_000));
        assert_eq!(mhz_to_khz(5_000_000), None);
        assert_eq!(
            Transponder::from_mhz(12_603, Polarization::Vertical),
            Some(Transponder::new(12_603_000, Polarization::Vertical))
        );
        assert_eq!(Transponder::from_mhz(u32::MAX, Polarization::Horizontal), None);
    }

    #[test]
    fn test_single_oscillator_never_hiband() {
        assert!(!LnbParams::DBS.is_hiband(12_500_000));
        assert!(!LnbParams::DBS.has_band_switch());
    }

    #[test]
    fn test_intermediate_frequency_universal() {
        let lnb = LnbParams::UNIVERSAL;
        let low = Transponder::new(11_494_000, Polarization::Horizontal);
        let high = Transponder::new(12_603_000, Polarization::Vertical);

        assert_eq!(lnb.intermediate_frequency_khz(&low), 1_744_000);
        assert_eq!(lnb.intermediate_frequency_khz(&high), 2_003_000);
    }

    #[test]
    fn test_intermediate_frequency_c_band_inverts() {
        // C-band oscillator sits above the downlink
        let t = Transponder::new(3_880_000, Polarization::Horizontal);
        assert_eq!(LnbParams::C_BAND.intermediate_frequency_khz(&t), 1_270_000);
    }

    #[test]
    fn test_intermediate_frequency_multipoint_by_polarization() {
        let lnb = LnbParams::C_MULTI;
        let v = Transponder::new(3_700_000, Polarization::Vertical);
        let h = Transponder::new(3_700_000, Polarization::Horizontal);

        assert_eq!(lnb.intermediate_frequency_khz(&v), 1_450_000);
        assert_eq!(lnb.intermediate_frequency_khz(&h), 2_050_000);
    }

    #[test]
    fn test_presets() {
        assert_eq!(LnbParams::preset("universal"), Some(LnbParams::UNIVERSAL));
        assert_eq!(LnbParams::preset("C-BAND"), Some(LnbParams::C_BAND));
        assert_eq!(LnbParams::preset("unknown"), None);
        assert_eq!(LnbParams::default(), LnbParams::UNIVERSAL);
    }
}
