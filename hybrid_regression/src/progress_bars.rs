#[cfg(feature = "progress")]
mod imp {
    use std::io::IsTerminal;
    use std::sync::atomic::{AtomicU64, Ordering};

    use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

    use crate::options::Options;

    pub(crate) struct ScoringProgress {
        show: bool,
        bar: ProgressBar,
        best_bits: AtomicU64,
        ansi: bool,
    }

    impl ScoringProgress {
        pub(crate) fn new(options: &Options, total: usize) -> Self {
            let show = options.progress && std::io::stderr().is_terminal();
            let bar = if show {
                let pb = ProgressBar::new(total as u64);
                pb.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
                pb.set_prefix(format!("Scoring {total} candidates..."));
                match ProgressStyle::with_template("{prefix} {wide_bar} {pos:>7}/{len:7} [{elapsed_precise}<{eta_precise}] {msg}") {
                    Ok(style) => pb.set_style(style),
                    Err(err) => log::debug!("progress template rejected: {err}"),
                }
                pb
            } else {
                ProgressBar::hidden()
            };
            Self {
                show,
                bar,
                best_bits: AtomicU64::new(f64::INFINITY.to_bits()),
                ansi: console::colors_enabled_stderr(),
            }
        }

        /// Safe to call from worker threads.
        pub(crate) fn on_scored(&self, fitness: f64) {
            if !self.show {
                return;
            }
            let prev = self
                .best_bits
                .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                    (fitness < f64::from_bits(bits)).then_some(fitness.to_bits())
                });
            if prev.is_ok() {
                self.bar.set_message(best_message(fitness, self.ansi));
            }
            self.bar.inc(1);
        }

        pub(crate) fn finish(&self) {
            if self.show {
                self.bar.finish();
            }
        }
    }

    fn best_message(best: f64, ansi: bool) -> String {
        let value = format!("{best:.4e}");
        if ansi {
            format!("best {}", console::style(value).green().bold())
        } else {
            format!("best {value}")
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn plain_message_has_no_escape_codes() {
            let msg = best_message(0.5, false);
            assert_eq!(msg, "best 5.0000e-1");
            let styled = best_message(0.5, true);
            assert_eq!(console::strip_ansi_codes(&styled), msg);
        }

        #[test]
        fn hidden_progress_ignores_updates() {
            let opts = Options {
                progress: false,
                ..Options::default()
            };
            let p = ScoringProgress::new(&opts, 3);
            p.on_scored(1.0);
            p.finish();
            assert_eq!(f64::from_bits(p.best_bits.load(Ordering::Relaxed)), f64::INFINITY);
        }
    }
}

#[cfg(not(feature = "progress"))]
mod imp {
    use crate::options::Options;

    pub(crate) struct ScoringProgress;

    impl ScoringProgress {
        pub(crate) fn new(_options: &Options, _total: usize) -> Self {
            Self
        }

        pub(crate) fn on_scored(&self, _fitness: f64) {}

        pub(crate) fn finish(&self) {}
    }
}

pub(crate) use imp::ScoringProgress;
