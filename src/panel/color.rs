use egui::Color32;

/// Colors the device firmware knows how to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedColor {
    Red,
    Green,
    Blue,
}

impl LedColor {
    /// Expects an already normalized (trimmed, lowercase) token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "red" => Some(LedColor::Red),
            "green" => Some(LedColor::Green),
            "blue" => Some(LedColor::Blue),
            _ => None,
        }
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            LedColor::Red => "color-red",
            LedColor::Green => "color-green",
            LedColor::Blue => "color-blue",
        }
    }

    pub fn fill(&self) -> Color32 {
        match self {
            LedColor::Red => Color32::from_rgb(230, 40, 40),
            LedColor::Green => Color32::from_rgb(40, 200, 70),
            LedColor::Blue => Color32::from_rgb(40, 90, 235),
        }
    }
}

/// Visual state of the on-screen LED.
///
/// `color` persists until another recognized color replaces it; `glow` is the
/// transient highlight that a timer clears.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Indicator {
    color: Option<LedColor>,
    glow: bool,
}

impl Indicator {
    pub fn color(&self) -> Option<LedColor> {
        self.color
    }

    pub fn is_glowing(&self) -> bool {
        self.glow
    }

    pub fn light(&mut self, color: LedColor) {
        self.color = Some(color);
        self.glow = true;
    }

    pub fn clear_glow(&mut self) {
        self.glow = false;
    }
}
