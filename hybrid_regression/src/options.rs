use crate::metrics::MetricKind;
use crate::optim::Bfgs;

#[rustfmt::skip]
macro_rules! hr_options_spec {
    ($m:ident) => {
        $m! {
            values {
                seed:
                    (u64, 0, "seed"),
                n_candidates:
                    (usize, 64, "n-candidates"),
                min_height:
                    (usize, 1, "min-height"),
                max_height:
                    (usize, 3, "max-height"),
                terminal_ratio:
                    (f64, 0.5, "terminal-ratio"),
                generation_retries:
                    (usize, 16, "generation-retries"),
                n_split:
                    (usize, 2, "n-split"),
                train_weight:
                    (f64, 0.0, "train-weight"),
                optimizer_iterations:
                    (usize, 100, "optimizer-iterations"),
                optimizer_nrestarts:
                    (usize, 2, "optimizer-nrestarts"),
                optimizer_f_calls_limit:
                    (usize, 10_000, "optimizer-f-calls-limit"),
                decimals:
                    (u32, 3, "decimals"),
                topn:
                    (usize, 10, "topn"),
            }
            neg_flags {
                progress:
                    (true, no_progress, "no-progress"),
            }
            pos_flags {
                grow:
                    (false, grow, "grow"),
            }
        }
    };
}

macro_rules! __define_options {
    (
        values { $( $name:ident: ($ty:ty, $default:expr, $cli_long:literal), )* }
        neg_flags { $( $iname:ident: ($bdefault:expr, $cli_name:ident, $cli_blong:literal), )* }
        pos_flags { $( $pname:ident: ($pdefault:expr, $cli_pname:ident, $cli_plong:literal), )* }
    ) => {
        /// Tunables for one scoring run.
        #[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
        #[cfg_attr(feature = "serde", serde(default))]
        #[derive(Clone, Debug, PartialEq)]
        pub struct Options {
            $(pub $name: $ty,)*
            $(pub $iname: bool,)*
            $(pub $pname: bool,)*

            pub metric: MetricKind,
            /// Added to the held-out fitness once per fitted constant.
            pub complexity_penalty: Option<f64>,
        }

        impl Default for Options {
            fn default() -> Self {
                Self {
                    $($name: $default,)*
                    $($iname: $bdefault,)*
                    $($pname: $pdefault,)*
                    metric: MetricKind::Mse,
                    complexity_penalty: None,
                }
            }
        }
    };
}

hr_options_spec!(__define_options);

impl Options {
    pub fn optimizer(&self) -> Bfgs {
        Bfgs {
            iterations: self.optimizer_iterations,
            f_calls_limit: self.optimizer_f_calls_limit,
            nrestarts: self.optimizer_nrestarts,
            seed: Some(self.seed),
        }
    }
}

#[cfg(feature = "cli")]
pub(crate) mod cli_args {
    use clap::Args;

    use super::Options;
    use crate::metrics::MetricKind;

    fn parse_metric(s: &str) -> Result<MetricKind, String> {
        MetricKind::parse(s).ok_or_else(|| format!("unknown metric {s:?} (expected mse, mae, rmse, huber, logcosh)"))
    }

    macro_rules! __define_options_args {
        (
            values { $( $name:ident: ($ty:ty, $default:expr, $cli_long:literal), )* }
            neg_flags { $( $iname:ident: ($bdefault:expr, $cli_name:ident, $cli_blong:literal), )* }
            pos_flags { $( $pname:ident: ($pdefault:expr, $cli_pname:ident, $cli_plong:literal), )* }
        ) => {
            #[derive(Args, Debug, Clone, Default)]
            pub struct OptionsArgs {
                $(
                    #[arg(long = $cli_long)]
                    pub $name: Option<$ty>,
                )*

                $(
                    #[arg(long = $cli_blong)]
                    pub $cli_name: bool,
                )*

                $(
                    #[arg(long = $cli_plong)]
                    pub $cli_pname: bool,
                )*

                #[arg(long, value_parser = parse_metric)]
                pub metric: Option<MetricKind>,

                #[arg(long = "complexity-penalty")]
                pub complexity_penalty: Option<f64>,
            }

            impl OptionsArgs {
                pub fn apply_to(&self, opt: &mut Options) {
                    $(
                        if let Some(v) = self.$name {
                            opt.$name = v;
                        }
                    )*

                    $(
                        if self.$cli_name {
                            opt.$iname = false;
                        }
                    )*

                    $(
                        if self.$cli_pname {
                            opt.$pname = true;
                        }
                    )*

                    if let Some(m) = self.metric {
                        opt.metric = m;
                    }
                    if self.complexity_penalty.is_some() {
                        opt.complexity_penalty = self.complexity_penalty;
                    }
                }
            }
        };
    }

    hr_options_spec!(__define_options_args);
}

#[cfg(all(test, feature = "cli"))]
mod cli_args_tests {
    use super::Options;
    use super::cli_args::OptionsArgs;
    use crate::metrics::MetricKind;

    #[test]
    fn cli_options_patch_applies() {
        let args = OptionsArgs {
            n_candidates: Some(123),
            no_progress: true,
            grow: true,
            metric: Some(MetricKind::Mae),
            complexity_penalty: Some(0.02),
            ..Default::default()
        };
        let mut opt = Options::default();
        args.apply_to(&mut opt);
        assert_eq!(opt.n_candidates, 123);
        assert!(!opt.progress);
        assert!(opt.grow);
        assert_eq!(opt.metric, MetricKind::Mae);
        assert_eq!(opt.complexity_penalty, Some(0.02));
        assert_eq!(opt.max_height, Options::default().max_height);
    }
}
