// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
// Core audio mixing logic that can be used by both CPAL and test implementations
use std::collections::HashMap;
use std::sync::Arc;

use super::eq::{ThreeBandCoefficients, ThreeBandFilter};
use crate::sampler::{compute_effective_gain, EqSettings, MixBus, VoiceId, VoiceState, VoiceTable};

/// Per-voice DSP state owned by the render path.
struct RenderState {
    /// One EQ filter per clip channel.
    filters: Vec<ThreeBandFilter>,
    /// Fade length captured when the voice was first seen stopping.
    fade_total: u32,
    fade_remaining: Option<u32>,
    /// The last cycle this voice was rendered in.
    last_cycle: u64,
}

impl RenderState {
    fn new(channels: usize) -> RenderState {
        RenderState {
            filters: vec![ThreeBandFilter::default(); channels],
            fade_total: 0,
            fade_remaining: None,
            last_cycle: 0,
        }
    }
}

/// Core audio mixing logic that's independent of any audio backend. Each cycle it reads the
/// published voice list and one copy of the mix bus, and renders every voice into the output.
pub struct AudioMixer {
    voices: Arc<VoiceTable>,
    bus: Arc<MixBus>,
    /// Number of output channels
    num_channels: u16,
    /// Sample rate
    sample_rate: u32,
    states: HashMap<VoiceId, RenderState>,
    /// None while the EQ is flat.
    eq: Option<ThreeBandCoefficients>,
    eq_settings: EqSettings,
    cycle: u64,
    /// One frame of the voice being rendered, after gain and EQ.
    scratch: Vec<f32>,
}

impl AudioMixer {
    /// Creates a new audio mixer
    pub fn new(
        voices: Arc<VoiceTable>,
        bus: Arc<MixBus>,
        num_channels: u16,
        sample_rate: u32,
    ) -> AudioMixer {
        AudioMixer {
            voices,
            bus,
            num_channels: num_channels.max(1),
            sample_rate,
            states: HashMap::new(),
            eq: None,
            eq_settings: EqSettings::default(),
            cycle: 0,
            scratch: vec![0.0; 2],
        }
    }

    /// Gets the number of output channels
    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }

    /// Gets the sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Renders one cycle into an interleaved output buffer. The buffer is overwritten.
    pub fn process_into_output(&mut self, output: &mut [f32]) {
        output.fill(0.0);
        let channels = self.num_channels as usize;
        let frames = output.len() / channels;
        if frames == 0 {
            return;
        }

        let mix = self.bus.settings();
        if mix.eq() != self.eq_settings {
            self.eq_settings = mix.eq();
            self.eq = if self.eq_settings.is_flat() {
                None
            } else {
                ThreeBandCoefficients::new(&self.eq_settings, self.sample_rate).ok()
            };
        }

        self.cycle += 1;
        let cycle = self.cycle;
        let voices = self.voices.snapshot();

        for voice in voices.iter() {
            let state = voice.state();
            if state == VoiceState::Ended {
                continue;
            }
            if voice.reached_end() {
                // The progress monitor releases live voices; a fading voice that ran out of clip
                // is simply done.
                if state == VoiceState::Stopping {
                    voice.end();
                }
                continue;
            }
            if state == VoiceState::Starting {
                voice.mark_playing();
            }

            let clip = voice.clip();
            let clip_channels = clip.channels() as usize;
            let clip_frames = clip.frames();
            if clip_frames == 0 {
                continue;
            }

            let mut gain = compute_effective_gain(
                voice.settings().volume(),
                mix.master_volume(),
                mix.muted(),
                mix.eq(),
            )
            .gain;
            if voice.is_muted() {
                gain = 0.0;
            }

            let render_state = self
                .states
                .entry(voice.id())
                .or_insert_with(|| RenderState::new(clip_channels));
            render_state.last_cycle = cycle;
            if state == VoiceState::Stopping && render_state.fade_remaining.is_none() {
                render_state.fade_total = voice.fade_frames();
                render_state.fade_remaining = Some(render_state.fade_total);
            }

            if self.scratch.len() < clip_channels {
                self.scratch.resize(clip_channels, 0.0);
            }

            let cursor = voice.cursor();
            let looping = voice.is_looping();
            let mut rendered = 0u64;
            for frame in 0..frames {
                let position = cursor + frame as u64;
                if !looping && position >= clip_frames {
                    break;
                }
                let fade = match render_state.fade_remaining.as_mut() {
                    Some(0) => break,
                    Some(remaining) => {
                        let fade = *remaining as f32 / render_state.fade_total as f32;
                        *remaining -= 1;
                        fade
                    }
                    None => 1.0,
                };
                let clip_frame = if looping {
                    position % clip_frames
                } else {
                    position
                };

                for ch in 0..clip_channels {
                    let mut sample = clip.sample(clip_frame, ch);
                    if let Some(eq) = self.eq.as_ref() {
                        sample = render_state.filters[ch].process_sample(eq, sample);
                    }
                    self.scratch[ch] = sample * gain * fade;
                }

                let out = &mut output[frame * channels..(frame + 1) * channels];
                if clip_channels == channels {
                    for (dest, sample) in out.iter_mut().zip(self.scratch.iter()) {
                        *dest += *sample;
                    }
                } else {
                    for (out_ch, dest) in out.iter_mut().enumerate() {
                        *dest += self.scratch[out_ch % clip_channels];
                    }
                }
                rendered += 1;
            }

            voice.advance(rendered);
            if render_state.fade_remaining == Some(0) {
                voice.end();
            }
        }

        self.states.retain(|_, state| state.last_cycle == cycle);
    }

    /// Processes multiple frames of audio mixing
    pub fn process_frames(&mut self, num_frames: usize) -> Vec<f32> {
        let mut frames = vec![0.0; num_frames * self.num_channels as usize];
        self.process_into_output(&mut frames);
        frames
    }
}
