//! Renders per-stage command templates into concrete jobs.

use std::path::PathBuf;

use crate::config::Config;
use crate::sizes::SizeClass;

use super::artifacts::ArtifactSet;
use super::types::{Job, Stage};

/// Command shapes for both stages, ready to be instantiated per size class.
#[derive(Debug, Clone)]
pub struct JobTemplate {
    program: PathBuf,
    generate_args: Vec<String>,
    validate_args: Vec<String>,
    iterations: u32,
    artifacts: ArtifactSet,
}

impl JobTemplate {
    pub fn new(
        program: impl Into<PathBuf>,
        generate_args: Vec<String>,
        validate_args: Vec<String>,
        iterations: u32,
        artifacts: ArtifactSet,
    ) -> Self {
        Self {
            program: program.into(),
            generate_args,
            validate_args,
            iterations,
            artifacts,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.tool.program.clone(),
            config.tool.generate_args.clone(),
            config.tool.validate_args.clone(),
            config.tool.iteration_count,
            ArtifactSet::new(config.output.work_dir.clone(), config.output.prefix.clone()),
        )
    }

    pub fn artifacts(&self) -> &ArtifactSet {
        &self.artifacts
    }

    /// Builds the job for `stage` at `size`.
    pub fn job(&self, stage: Stage, size: SizeClass) -> Job {
        let candidates = self.artifacts.candidates(size);
        let result = self.artifacts.result(size);

        let (templates, input, output) = match stage {
            Stage::Generate => (&self.generate_args, None, candidates.clone()),
            Stage::Validate => (&self.validate_args, Some(candidates.clone()), result.clone()),
        };

        let args = templates
            .iter()
            .map(|arg| {
                arg.replace("{bits}", &size.to_string())
                    .replace("{iterations}", &self.iterations.to_string())
                    .replace("{candidates}", &candidates.to_string_lossy())
                    .replace("{result}", &result.to_string_lossy())
            })
            .collect();

        Job {
            stage,
            size_class: size,
            program: self.program.clone(),
            args,
            input,
            output,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> JobTemplate {
        let mut config = Config::default();
        config.output.work_dir = PathBuf::from("/work");
        JobTemplate::from_config(&config)
    }

    #[test]
    fn test_generate_job_rendering() {
        let job = template().job(Stage::Generate, SizeClass::new(4096));
        assert_eq!(job.program, PathBuf::from("ssh-keygen"));
        assert_eq!(
            job.args,
            vec!["-M", "generate", "-O", "bits=4096", "/work/moduli-4096.candidates"]
        );
        assert_eq!(job.input, None);
        assert_eq!(job.output, PathBuf::from("/work/moduli-4096.candidates"));
    }

    #[test]
    fn test_validate_job_rendering() {
        let job = template().job(Stage::Validate, SizeClass::new(3072));
        assert_eq!(
            job.args,
            vec![
                "-M",
                "screen",
                "-O",
                "prime-rounds=100",
                "-f",
                "/work/moduli-3072.candidates",
                "/work/moduli-3072",
            ]
        );
        assert_eq!(
            job.input,
            Some(PathBuf::from("/work/moduli-3072.candidates"))
        );
        assert_eq!(job.output, PathBuf::from("/work/moduli-3072"));
    }

    #[test]
    fn test_custom_template() {
        let template = JobTemplate::new(
            "/opt/tool",
            vec!["gen".into(), "--bits={bits}".into(), "--out={candidates}".into()],
            vec![
                "check".into(),
                "-n{iterations}".into(),
                "{candidates}".into(),
                "{result}".into(),
            ],
            7,
            ArtifactSet::new("/tmp", "m"),
        );

        let job = template.job(Stage::Validate, SizeClass::new(2048));
        assert_eq!(job.args, vec!["check", "-n7", "/tmp/m-2048.candidates", "/tmp/m-2048"]);
    }
}
