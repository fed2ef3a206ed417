//! Mobile responsiveness audit: viewport emulation, screenshots, and
//! in-page layout checks.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Interactive elements smaller than this (either dimension) are flagged.
const MIN_TOUCH_TARGET_PX: u32 = 44;
/// Text below this computed size is flagged.
const MIN_FONT_SIZE_PX: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Mobile => "mobile",
            DeviceClass::Tablet => "tablet",
            DeviceClass::Desktop => "desktop",
        }
    }
}

/// A `(width, height, deviceScaleFactor, isMobile, hasTouch)` tuple driving
/// the browser's emulation.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub device: DeviceClass,
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
    pub is_mobile: bool,
    pub has_touch: bool,
}

/// The three audited viewports.
pub const VIEWPORTS: [Viewport; 3] = [
    Viewport {
        device: DeviceClass::Mobile,
        width: 375,
        height: 667,
        device_scale_factor: 2.0,
        is_mobile: true,
        has_touch: true,
    },
    Viewport {
        device: DeviceClass::Tablet,
        width: 768,
        height: 1024,
        device_scale_factor: 2.0,
        is_mobile: true,
        has_touch: true,
    },
    Viewport {
        device: DeviceClass::Desktop,
        width: 1920,
        height: 1080,
        device_scale_factor: 1.0,
        is_mobile: false,
        has_touch: false,
    },
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportResult {
    pub device: DeviceClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_ref: Option<PathBuf>,
    pub issues: Vec<String>,
    pub has_overflow: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileTestResult {
    pub url: String,
    pub viewports: Vec<ViewportResult>,
    /// Issues aggregated across viewports, de-duplicated, first-seen order
    pub overall_issues: Vec<String>,
    pub responsive: bool,
}

impl MobileTestResult {
    pub fn from_viewports(url: &str, viewports: Vec<ViewportResult>) -> Self {
        let mut overall_issues = Vec::new();
        for viewport in &viewports {
            for issue in &viewport.issues {
                if !overall_issues.contains(issue) {
                    overall_issues.push(issue.clone());
                }
            }
        }
        let responsive = overall_issues.is_empty();
        Self {
            url: url.to_string(),
            viewports,
            overall_issues,
            responsive,
        }
    }
}

/// Raw counts the in-page layout script reports for one viewport.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct LayoutProbe {
    #[serde(default)]
    pub has_overflow: bool,
    #[serde(default)]
    pub small_touch_targets: usize,
    #[serde(default)]
    pub tiny_font_elements: usize,
    #[serde(default)]
    pub full_width_fixed: usize,
}

/// Render the probe counts into issue strings, applying the per-viewport
/// check applicability: touch targets on mobile and tablet only, fixed
/// bars on mobile only.
pub(crate) fn layout_issues(probe: &LayoutProbe, device: DeviceClass) -> Vec<String> {
    let mut issues = Vec::new();

    if probe.has_overflow {
        issues.push("Horizontal scrollbar detected".to_string());
    }

    if matches!(device, DeviceClass::Mobile | DeviceClass::Tablet) && probe.small_touch_targets > 0
    {
        issues.push(format!(
            "{} touch targets smaller than {}x{}px",
            probe.small_touch_targets, MIN_TOUCH_TARGET_PX, MIN_TOUCH_TARGET_PX
        ));
    }

    if probe.tiny_font_elements > 0 {
        issues.push(format!(
            "{} elements with font size smaller than {}px",
            probe.tiny_font_elements, MIN_FONT_SIZE_PX
        ));
    }

    if device == DeviceClass::Mobile && probe.full_width_fixed > 0 {
        issues.push(format!(
            "{} full-width fixed elements detected",
            probe.full_width_fixed
        ));
    }

    issues
}

/// In-page layout inspector. Counts are device-agnostic; applicability is
/// decided on the Rust side.
pub(crate) const LAYOUT_JS: &str = r#"
(() => {
  const doc = document.documentElement;
  const hasOverflow = doc.scrollWidth > window.innerWidth;

  const interactive = document.querySelectorAll(
    'a, button, input, select, textarea, [onclick], [role="button"]'
  );
  let smallTouchTargets = 0;
  for (const el of interactive) {
    const rect = el.getBoundingClientRect();
    if (rect.width > 0 && rect.height > 0 && (rect.width < 44 || rect.height < 44)) {
      smallTouchTargets += 1;
    }
  }

  let tinyFontElements = 0;
  let fullWidthFixed = 0;
  for (const el of document.body ? document.body.querySelectorAll('*') : []) {
    const style = window.getComputedStyle(el);
    const hasText = Array.from(el.childNodes).some(
      (n) => n.nodeType === Node.TEXT_NODE && n.textContent.trim().length > 0
    );
    if (hasText && parseFloat(style.fontSize) < 12) {
      tinyFontElements += 1;
    }
    if (style.position === 'fixed') {
      const rect = el.getBoundingClientRect();
      if (rect.width > window.innerWidth * 0.9) {
        fullWidthFixed += 1;
      }
    }
  }

  return {
    has_overflow: hasOverflow,
    small_touch_targets: smallTouchTargets,
    tiny_font_elements: tinyFontElements,
    full_width_fixed: fullWidthFixed,
  };
})()
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mobile_viewport_reports_all_checks() {
        let probe = LayoutProbe {
            has_overflow: false,
            small_touch_targets: 3,
            tiny_font_elements: 2,
            full_width_fixed: 0,
        };

        let issues = layout_issues(&probe, DeviceClass::Mobile);
        assert!(issues.contains(&"3 touch targets smaller than 44x44px".to_string()));
        assert!(issues.contains(&"2 elements with font size smaller than 12px".to_string()));
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn desktop_skips_touch_and_fixed_checks() {
        let probe = LayoutProbe {
            has_overflow: true,
            small_touch_targets: 5,
            tiny_font_elements: 0,
            full_width_fixed: 2,
        };

        let issues = layout_issues(&probe, DeviceClass::Desktop);
        assert_eq!(issues, vec!["Horizontal scrollbar detected".to_string()]);
    }

    #[test]
    fn tablet_counts_touch_targets_but_not_fixed_bars() {
        let probe = LayoutProbe {
            has_overflow: false,
            small_touch_targets: 1,
            tiny_font_elements: 0,
            full_width_fixed: 4,
        };

        let issues = layout_issues(&probe, DeviceClass::Tablet);
        assert_eq!(issues, vec!["1 touch targets smaller than 44x44px".to_string()]);
    }

    #[test]
    fn aggregate_dedups_and_derives_responsive() {
        let viewports = vec![
            ViewportResult {
                device: DeviceClass::Mobile,
                screenshot_ref: None,
                issues: vec!["Horizontal scrollbar detected".to_string()],
                has_overflow: true,
                error: None,
            },
            ViewportResult {
                device: DeviceClass::Tablet,
                screenshot_ref: None,
                issues: vec!["Horizontal scrollbar detected".to_string()],
                has_overflow: true,
                error: None,
            },
            ViewportResult {
                device: DeviceClass::Desktop,
                screenshot_ref: None,
                issues: vec![],
                has_overflow: false,
                error: None,
            },
        ];

        let result = MobileTestResult::from_viewports("https://new.site/", viewports);
        assert_eq!(result.overall_issues.len(), 1);
        assert!(!result.responsive);
    }

    #[test]
    fn clean_page_is_responsive() {
        let viewports = VIEWPORTS
            .iter()
            .map(|viewport| ViewportResult {
                device: viewport.device,
                screenshot_ref: None,
                issues: vec![],
                has_overflow: false,
                error: None,
            })
            .collect();

        let result = MobileTestResult::from_viewports("https://new.site/", viewports);
        assert!(result.responsive);
        assert!(result.overall_issues.is_empty());
    }

    #[test]
    fn failed_viewport_contributes_no_issues() {
        let viewports = vec![ViewportResult {
            device: DeviceClass::Mobile,
            screenshot_ref: None,
            issues: vec![],
            has_overflow: false,
            error: Some("navigation timed out".to_string()),
        }];

        let result = MobileTestResult::from_viewports("https://new.site/slow", viewports);
        assert!(result.responsive);
        assert_eq!(result.viewports[0].error.as_deref(), Some("navigation timed out"));
    }
}
