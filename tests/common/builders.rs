//! Test data builders for creating test objects

use xrd_rs::project::{Pattern, Phase, Project, Specimen};

/// Builder for synthetic diffraction patterns
pub struct PatternBuilder {
    start: f64,
    step: f64,
    intensities: Vec<f64>,
}

impl PatternBuilder {
    pub fn new() -> Self {
        Self {
            start: 3.0,
            step: 0.02,
            intensities: Vec::new(),
        }
    }

    pub fn start(mut self, start: f64) -> Self {
        self.start = start;
        self
    }

    pub fn step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    pub fn intensities(mut self, intensities: &[f64]) -> Self {
        self.intensities = intensities.to_vec();
        self
    }

    /// A single gaussian peak over `points` positions
    pub fn peak(mut self, points: usize, center: usize, height: f64) -> Self {
        self.intensities = (0..points)
            .map(|i| {
                let d = i as f64 - center as f64;
                height * (-d * d / 50.0).exp()
            })
            .collect();
        self
    }

    pub fn build(self) -> Pattern {
        let two_theta = (0..self.intensities.len())
            .map(|i| self.start + self.step * i as f64)
            .collect();
        Pattern::new(two_theta, self.intensities).expect("builder keeps lengths equal")
    }
}

impl Default for PatternBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for test projects
pub struct ProjectBuilder {
    project: Project,
}

impl ProjectBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            project: Project::new(name),
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.project.description = description.to_string();
        self
    }

    pub fn layout(mut self, layout: &str) -> Self {
        self.project.layout = layout.to_string();
        self
    }

    pub fn phase(mut self, name: &str, weight_fraction: f64) -> Self {
        self.project.phases.push(Phase::new(name, weight_fraction));
        self
    }

    pub fn specimen(mut self, name: &str, pattern: Pattern) -> Self {
        self.project
            .specimens
            .push(Specimen::new(name).with_pattern(pattern));
        self
    }

    pub fn build(self) -> Project {
        self.project
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_builder() {
        let project = ProjectBuilder::new("Mix")
            .layout("VIEWONLY")
            .phase("Illite", 0.6)
            .specimen("AD", PatternBuilder::new().intensities(&[1.0, 2.0]).build())
            .build();

        assert_eq!(project.name, "Mix");
        assert_eq!(project.layout, "VIEWONLY");
        assert_eq!(project.phases.len(), 1);
        assert_eq!(project.specimens.len(), 1);
    }

    #[test]
    fn test_pattern_builder_peak() {
        let pattern = PatternBuilder::new().peak(41, 20, 100.0).build();
        assert_eq!(pattern.len(), 41);
        assert_eq!(pattern.summary().max_intensity, 100.0);
    }
}
