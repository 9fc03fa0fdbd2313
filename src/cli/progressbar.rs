use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::{sync::mpsc::UnboundedReceiver, task::JoinHandle};

// "█▉▊▋▌▍▎▏  ·"
const PROGRES_CHARS: &str =
    "\u{2588}\u{2589}\u{258a}\u{258b}\u{258c}\u{258d}\u{258e}\u{258f}  \u{b7}";

const PROGRES_CHARS_SPINNER: &[&str] = &[
    "\u{2801}", "\u{2802}", "\u{2804}", "\u{2840}", "\u{2880}", "\u{2820}", "\u{2810}", "\u{2808}",
    "",
];

#[derive(Default, Debug)]
pub struct Bar {
    pub progress: Option<ProgressBar>,
}

impl Bar {
    /// Progress bar for a known size, a spinner otherwise
    #[must_use]
    pub fn new(size: Option<u64>, quiet: bool) -> Self {
        if quiet {
            return Self::default();
        }

        match size {
            Some(size) => Self::new_bar(size),
            None => Self::new_spinner_stream(),
        }
    }

    fn new_bar(size: u64) -> Self {
        let pb = ProgressBar::new(size);

        let style_result = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:50.green/blue} {bytes}/{total_bytes} ({bytes_per_sec} - {eta})");

        let style = match style_result {
            Ok(style) => style,
            Err(err) => {
                eprintln!("Error creating progress bar style: {err}");
                return Self { progress: None };
            }
        };

        pb.set_style(style.progress_chars(PROGRES_CHARS));

        Self { progress: Some(pb) }
    }

    fn new_spinner_stream() -> Self {
        let pb = ProgressBar::new_spinner();

        pb.enable_steady_tick(Duration::from_millis(200));

        let style_result = ProgressStyle::default_spinner()
            .tick_strings(PROGRES_CHARS_SPINNER)
            .template("[{elapsed_precise}] {bytes} ({bytes_per_sec}) {spinner:.green}");

        let style = match style_result {
            Ok(s) => s,
            Err(err) => {
                eprintln!("Error creating spinner style: {err}");
                return Self { progress: None };
            }
        };

        pb.set_style(style);

        Self { progress: Some(pb) }
    }

    /// Advance with every uploaded part until all senders are dropped.
    #[must_use]
    pub fn follow(self, mut rx: UnboundedReceiver<u64>) -> JoinHandle<u64> {
        tokio::spawn(async move {
            let mut total: u64 = 0;

            while let Some(bytes) = rx.recv().await {
                total += bytes;

                if let Some(pb) = &self.progress {
                    pb.inc(bytes);
                }
            }

            if let Some(pb) = &self.progress {
                pb.finish();
            }

            total
        })
    }
}
