use super::fft::{Complex, Fft};

/// Uniformly partitioned overlap-save convolution.
///
/// The impulse response is split into partitions of `block` samples whose
/// spectra are multiplied against a frequency-domain delay line of past input
/// spectra. Latency is zero; cost per block is one forward and one inverse FFT
/// of size `2 * block` plus one complex multiply-add per partition bin.
#[derive(Debug, Clone)]
pub struct PartitionedConvolver {
    block: usize,
    fft: Fft,
    partitions: Vec<Vec<Complex>>,
    delay_line: Vec<Vec<Complex>>,
    newest: usize,
    window: Vec<f32>,
    spectrum: Vec<Complex>,
}

impl PartitionedConvolver {
    /// `block` must be a power of two.
    pub fn new(impulse: &[f32], block: usize) -> Self {
        let fft_size = block * 2;
        let fft = Fft::new(fft_size);
        let count = impulse.len().div_ceil(block).max(1);

        let partitions = (0..count)
            .map(|index| {
                let mut spectrum = vec![Complex::ZERO; fft_size];
                let start = index * block;
                let end = (start + block).min(impulse.len());
                if start < end {
                    for (slot, sample) in spectrum.iter_mut().zip(&impulse[start..end]) {
                        slot.re = *sample;
                    }
                }
                fft.forward(&mut spectrum);
                spectrum
            })
            .collect();

        Self {
            block,
            partitions,
            delay_line: vec![vec![Complex::ZERO; fft_size]; count],
            newest: 0,
            window: vec![0.0; fft_size],
            spectrum: vec![Complex::ZERO; fft_size],
            fft,
        }
    }

    pub fn block_size(&self) -> usize {
        self.block
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Convolves one block. `input` and `output` must hold `block` samples.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        let block = self.block;
        let count = self.partitions.len();

        self.window.copy_within(block.., 0);
        self.window[block..].copy_from_slice(&input[..block]);

        self.newest = (self.newest + count - 1) % count;
        let slot = &mut self.delay_line[self.newest];
        for (bin, sample) in slot.iter_mut().zip(self.window.iter()) {
            *bin = Complex::new(*sample, 0.0);
        }
        self.fft.forward(slot);

        self.spectrum.fill(Complex::ZERO);
        for (age, partition) in self.partitions.iter().enumerate() {
            let past = &self.delay_line[(self.newest + age) % count];
            for ((acc, x), h) in self.spectrum.iter_mut().zip(past.iter()).zip(partition.iter()) {
                *acc += *x * *h;
            }
        }

        self.fft.inverse(&mut self.spectrum);
        for (out, value) in output[..block].iter_mut().zip(self.spectrum[block..].iter()) {
            *out = value.re;
        }
    }

    pub fn reset(&mut self) {
        self.window.fill(0.0);
        for spectrum in &mut self.delay_line {
            spectrum.fill(Complex::ZERO);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Vec<f32> {
        (0..len).map(|i| (i as f32 * 0.37).sin()).collect()
    }

    #[test]
    fn unit_impulse_is_identity() {
        let mut convolver = PartitionedConvolver::new(&[1.0], 16);
        let input = ramp(48);
        let mut output = vec![0.0; 48];
        for (inp, out) in input.chunks(16).zip(output.chunks_mut(16)) {
            convolver.process(inp, out);
        }
        for (a, b) in input.iter().zip(output.iter()) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn delayed_impulse_crosses_partitions() {
        let delay = 19;
        let mut impulse = vec![0.0; delay + 1];
        impulse[delay] = 0.5;
        let mut convolver = PartitionedConvolver::new(&impulse, 8);
        assert_eq!(convolver.partition_count(), 3);

        let input = ramp(64);
        let mut output = vec![0.0; 64];
        for (inp, out) in input.chunks(8).zip(output.chunks_mut(8)) {
            convolver.process(inp, out);
        }
        for n in 0..64 {
            let expected = if n >= delay { 0.5 * input[n - delay] } else { 0.0 };
            assert!((output[n] - expected).abs() < 1e-4, "sample {}", n);
        }
    }
}
