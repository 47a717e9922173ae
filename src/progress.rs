use std::io;
use std::io::Write;
use std::time;


pub trait ProgressSink {
	fn update(&mut self, done: usize);
	fn finish(&mut self, done: usize);
}


/// Discards all progress, for non-interactive output.
pub struct NullSink;

impl ProgressSink for NullSink {
	fn update(&mut self, _done: usize) {}
	fn finish(&mut self, _done: usize) {}
}


/// Carriage-return-overwritten count and rate on stdout.
pub struct ProgressMeter {
	t0: time::Instant,
	tprev: time::Instant,
	iprev: usize,
}

impl ProgressMeter {
	pub fn start() -> Self {
		let now = time::Instant::now();
		Self{
			t0: now,
			tprev: now,
			iprev: 0,
		}
	}
}

impl ProgressSink for ProgressMeter {
	fn update(&mut self, done: usize) {
		let now = time::Instant::now();
		let dt = (now - self.tprev).as_secs_f64();
		let rate = done.saturating_sub(self.iprev) as f64 / dt;
		print!("{:12} [{:10.0}/s]\r", done, rate);
		// progress is best-effort
		let _ = io::stdout().flush();
		self.iprev = done;
		self.tprev = now;
	}

	fn finish(&mut self, done: usize) {
		let dt = (time::Instant::now() - self.t0).as_secs_f64();
		let rate = done as f64 / dt;
		println!("{:12} [{:10.0}/s]", done, rate);
	}
}


pub fn default_output() -> Box<dyn ProgressSink> {
	if isatty::stdout_isatty() {
		Box::new(ProgressMeter::start())
	} else {
		Box::new(NullSink)
	}
}


/// Forwards every `step`-th count to the sink.
pub struct CountMeter<'s, S: ProgressSink + ?Sized> {
	sink: &'s mut S,
	step: usize,
	n: usize,
}

impl<'s, S: ProgressSink + ?Sized> CountMeter<'s, S> {
	pub fn new(sink: &'s mut S, step: usize) -> Self {
		Self{
			sink,
			step: step.max(1),
			n: 0,
		}
	}

	pub fn tick(&mut self) {
		self.n += 1;
		if self.n % self.step == 0 {
			self.sink.update(self.n);
		}
	}

	pub fn count(&self) -> usize {
		self.n
	}

	pub fn finish(self) -> usize {
		self.sink.finish(self.n);
		self.n
	}
}
