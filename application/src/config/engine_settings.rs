use lua3d_domain::Color;
use std::time::Duration;

/// Engine loop configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Window title passed to the windowing collaborator.
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Frame rate cap; `None` runs ticks back to back.
    pub target_fps: Option<u32>,
    /// Initial renderer clear color, before any script changes it.
    pub clear_color: Color,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            title: "lua3d".to_string(),
            width: 800,
            height: 600,
            target_fps: None,
            clear_color: Color::BLACK,
        }
    }
}

impl EngineSettings {
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            width,
            height,
            ..Default::default()
        }
    }

    pub fn with_target_fps(mut self, fps: Option<u32>) -> Self {
        self.target_fps = fps.filter(|fps| *fps > 0);
        self
    }

    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    /// Minimum duration of one tick, if a frame rate cap is set.
    pub fn frame_budget(&self) -> Option<Duration> {
        self.target_fps
            .map(|fps| Duration::from_secs_f64(1.0 / f64::from(fps)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = EngineSettings::default();
        assert_eq!(settings.width, 800);
        assert_eq!(settings.height, 600);
        assert!(settings.frame_budget().is_none());
    }

    #[test]
    fn test_zero_fps_means_uncapped() {
        let settings = EngineSettings::default().with_target_fps(Some(0));
        assert!(settings.target_fps.is_none());
    }

    #[test]
    fn test_frame_budget_from_fps() {
        let settings = EngineSettings::default().with_target_fps(Some(50));
        assert_eq!(settings.frame_budget(), Some(Duration::from_millis(20)));
    }
}
