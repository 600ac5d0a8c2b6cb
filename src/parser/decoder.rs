use std::fmt;

use log::{debug, warn};

use super::color_table::ColorTable;
use super::lzw::{self, LzwReport};
use super::stream::ByteStream;
use super::DisposalMethod;
use crate::compositor::{Compositor, ImageBlock};
use crate::error::DecodeError;
use crate::frame::Frame;
use crate::options::{CorruptionPolicy, DecoderOptions};

const EXTENSION_INTRODUCER: u8 = 0x21;
const IMAGE_DESCRIPTOR_LABEL: u8 = 0x2c;
const TRAILER_LABEL: u8 = 0x3b;

// Extension labels
const APPLICATION_EXTENSION: u8 = 0xff;
const COMMENT_EXTENSION: u8 = 0xfe;
const GRAPHIC_CONTROL_EXTENSION: u8 = 0xf9;
const PLAIN_TEXT_EXTENSION: u8 = 0x01;

#[derive(Debug)]
enum ExtensionType {
    Application,
    Comment,
    GraphicControl,
    PlainText,
    Unknown(u8),
}

impl From<u8> for ExtensionType {
    fn from(value: u8) -> Self {
        use ExtensionType::*;

        match value {
            APPLICATION_EXTENSION => Application,
            COMMENT_EXTENSION => Comment,
            GRAPHIC_CONTROL_EXTENSION => GraphicControl,
            PLAIN_TEXT_EXTENSION => PlainText,
            label => Unknown(label),
        }
    }
}

/// Latest graphic control extension. It applies to every following image until the next
/// one replaces it.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct GraphicControlState {
    disposal_method: DisposalMethod,
    transparent_color_flag: bool,

    delay_time: u16,
    transparent_color_index: u8,
}

impl GraphicControlState {
    fn transparency(&self) -> Option<u8> {
        self.transparent_color_flag.then_some(self.transparent_color_index)
    }

    fn delay_ms(&self) -> u32 {
        u32::from(self.delay_time) * 10
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V87a,
    V89a,
}

impl TryFrom<&str> for Version {
    type Error = DecodeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "87a" => Ok(Version::V87a),
            "89a" => Ok(Version::V89a),
            version => Err(DecodeError::UnsupportedVersion(version.into())),
        }
    }
}

/// Loop count from a NETSCAPE2.0 application extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCount {
    Infinite,
    Number(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalScreenDescriptor {
    pub screen_width: u16,
    pub screen_height: u16,
    pub global_color_table_flag: bool,
    pub color_resolution: u8,
    pub sort_flag: bool,
    /// Packed size field; the table holds `2^(size + 1)` colors.
    pub global_color_table_size: u8,
    pub background_color_index: u8,
    pub pixel_aspect_ratio: u8,
}

#[derive(Debug)]
enum ParserState {
    ProcessMagic,
    ProcessLogicalScreenDescriptor,
    ProcessGlobalColorTable,
    DetermineNextBlock,
    Done,
}

/// Outcome of one parser step.
#[derive(Debug)]
pub(crate) enum Step {
    Continue,
    Frame(Frame),
    Finished,
}

/// Everything besides frames that the stream declared.
#[derive(Debug, Default)]
pub(crate) struct Metadata {
    pub(crate) version: Option<Version>,
    pub(crate) global_color_table: Option<ColorTable>,
    pub(crate) comment: String,
    pub(crate) loop_count: Option<LoopCount>,
}

/// Resumable GIF block parser. Each call to `step` handles one structure of the stream
/// (the header, the screen descriptor, the global table, or one whole block).
pub(crate) struct Parser {
    stream: ByteStream,
    state: ParserState,
    options: DecoderOptions,
    screen: Option<LogicalScreenDescriptor>,
    graphic_control: GraphicControlState,
    metadata: Metadata,
    compositor: Compositor,
    // index buffer shared by every image, resized only when the pixel count changes
    pixels: Vec<u8>,
    elapsed: u64,
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("state", &self.state)
            .field("position", &self.stream.position())
            .field("total", &self.stream.len())
            .field("elapsed", &self.elapsed)
            .finish()
    }
}

impl Parser {
    pub(crate) fn new(data: Vec<u8>, options: DecoderOptions) -> Self {
        Self {
            stream: ByteStream::new(data),
            state: ParserState::ProcessMagic,
            options,
            screen: None,
            graphic_control: GraphicControlState::default(),
            metadata: Metadata::default(),
            compositor: Compositor::new(options.disposal),
            pixels: Vec::new(),
            elapsed: 0,
        }
    }

    pub(crate) fn screen(&self) -> Option<LogicalScreenDescriptor> {
        self.screen
    }

    pub(crate) fn bytes_read(&self) -> usize {
        self.stream.position()
    }

    pub(crate) fn total_bytes(&self) -> usize {
        self.stream.len()
    }

    pub(crate) fn finish(self) -> Metadata {
        self.metadata
    }

    fn strict(&self) -> bool {
        self.options.corruption == CorruptionPolicy::Strict
    }

    /// Runs the next state. `previous` is the last frame produced so far, which the next
    /// image gets composited over.
    pub(crate) fn step(&mut self, previous: Option<&Frame>) -> Result<Step, DecodeError> {
        let state = std::mem::replace(&mut self.state, ParserState::Done);
        debug!("begin parsing state {:?}", state);

        let step = self.process_next_state(state, previous)?;

        if self.strict() && self.stream.overrun() {
            self.state = ParserState::Done;
            return Err(DecodeError::CorruptStream(format!(
                "unexpected end of data after {} bytes",
                self.stream.len()
            )));
        }
        Ok(step)
    }

    fn process_next_state(&mut self, state: ParserState, previous: Option<&Frame>) -> Result<Step, DecodeError> {
        use ParserState::*;

        match state {
            ProcessMagic => {
                let signature = self.stream.read_string(3);
                if signature != "GIF" {
                    return Err(DecodeError::InvalidSignature);
                }
                let version = Version::try_from(self.stream.read_string(3).as_str())?;
                debug!("processed signature, got GIF {:?}", version);
                self.metadata.version = Some(version);

                self.state = ProcessLogicalScreenDescriptor;
                Ok(Step::Continue)
            }
            ProcessLogicalScreenDescriptor => {
                let screen_width = self.stream.read_u16();
                let screen_height = self.stream.read_u16();

                let packed_fields = self.stream.read_byte();

                // packed field start
                let global_color_table_flag = packed_fields & 0b10000000 != 0;
                let color_resolution = (packed_fields >> 4) & 0b00000111;
                let sort_flag = packed_fields & 0b00001000 != 0;
                let global_color_table_size = packed_fields & 0b00000111;
                // packed field end

                let background_color_index = self.stream.read_byte();
                let pixel_aspect_ratio = self.stream.read_byte();

                let screen = LogicalScreenDescriptor {
                    screen_width,
                    screen_height,
                    global_color_table_flag,
                    color_resolution,
                    sort_flag,
                    global_color_table_size,
                    background_color_index,
                    pixel_aspect_ratio,
                };
                debug!("processed logical screen descriptor, got: {:?}", screen);

                self.compositor.set_screen(screen_width, screen_height);
                self.screen = Some(screen);

                self.state = if global_color_table_flag {
                    ProcessGlobalColorTable
                } else {
                    DetermineNextBlock
                };
                Ok(Step::Continue)
            }
            ProcessGlobalColorTable => {
                let size = self.screen.map_or(0, |screen| screen.global_color_table_size);
                let table = ColorTable::from_rgb_bytes(self.stream.read_bytes(ColorTable::byte_len(size)));
                debug!("processed global color table, got: {:?}", table);
                self.metadata.global_color_table = Some(table);

                self.state = DetermineNextBlock;
                Ok(Step::Continue)
            }
            DetermineNextBlock => {
                let introducer_or_label = self.stream.read_byte();

                match introducer_or_label {
                    // extension introducer means that a label follows determining what exact type
                    // of extension it is.
                    EXTENSION_INTRODUCER => {
                        let label = self.stream.read_byte();
                        self.process_extension(ExtensionType::from(label));
                        self.state = DetermineNextBlock;
                        Ok(Step::Continue)
                    }
                    IMAGE_DESCRIPTOR_LABEL => {
                        let frame = self.process_image(previous)?;
                        self.state = if self.options.first_frame_only {
                            debug!("first frame only, stopping");
                            Done
                        } else {
                            DetermineNextBlock
                        };
                        Ok(Step::Frame(frame))
                    }
                    TRAILER_LABEL => {
                        debug!("reached trailer at byte {}", self.stream.position());
                        Ok(Step::Finished)
                    }
                    label if self.strict() => Err(DecodeError::CorruptStream(format!(
                        "unexpected block label 0x{label:02x} at byte {}",
                        self.stream.position() - 1
                    ))),
                    label => {
                        warn!(
                            "encountered unexpected label 0x{label:02x} at byte {}, treating it as the end of the stream",
                            self.stream.position()
                        );
                        Ok(Step::Finished)
                    }
                }
            }
            Done => Ok(Step::Finished),
        }
    }

    fn process_extension(&mut self, label: ExtensionType) {
        use ExtensionType::*;

        debug!("processing extension type: {:?}", label);
        match label {
            Application => {
                let block_size = self.stream.read_byte();
                let header = self.stream.read_bytes(block_size.into()).to_vec();
                let application_data = self.stream.read_sub_blocks_as_vec();

                if header.as_slice() == b"NETSCAPE2.0" && application_data.len() >= 3 && application_data[0] == 1 {
                    let loop_number = u16::from_le_bytes([application_data[1], application_data[2]]);
                    let loop_count = match loop_number {
                        0 => LoopCount::Infinite,
                        number => LoopCount::Number(number),
                    };
                    debug!("processed loop count, got: {:?}", loop_count);
                    self.metadata.loop_count = Some(loop_count);
                } else {
                    debug!(
                        "skipped application block {}, {} bytes of data",
                        String::from_utf8_lossy(&header),
                        application_data.len()
                    );
                }
            }
            Comment => {
                // sequence of data sub-blocks
                let text = self.stream.read_sub_blocks();
                debug!("processed comment block, got: {}", text);
                self.metadata.comment.push_str(&text);
            }
            GraphicControl => {
                let block_size = self.stream.read_byte();
                if block_size != 4 {
                    warn!("graphic control extension with block size {block_size}, expected 4");
                }
                // fields come from the first 4 bytes, missing ones read as zero
                let mut body = [0u8; 4];
                let declared = self.stream.read_bytes(block_size.into());
                let used = declared.len().min(4);
                body[..used].copy_from_slice(&declared[..used]);

                let packed_fields = body[0];
                // packed fields definition
                // XXXYYYZW
                // XXX = reserved, not needed
                // YYY = disposal method, indicates what to do with graphic after displaying
                // Z = user input flag, ignored
                // W = transparent color flag
                self.graphic_control = GraphicControlState {
                    disposal_method: DisposalMethod::from_u8((packed_fields >> 2) & 0b00000111),
                    transparent_color_flag: packed_fields & 0b00000001 != 0,
                    delay_time: u16::from_le_bytes([body[1], body[2]]),
                    transparent_color_index: body[3],
                };

                // block terminator
                self.stream.skip_sub_blocks();

                debug!("processed GraphicControlExtension: {:?}", self.graphic_control);
            }
            PlainText => {
                // not rendered, skip the header and the text
                let block_size = self.stream.read_byte();
                self.stream.read_bytes(block_size.into());
                self.stream.skip_sub_blocks();
            }
            Unknown(label) => {
                debug!("skipping unknown extension 0x{label:02x}");
                self.stream.skip_sub_blocks();
            }
        }
    }

    fn process_image(&mut self, previous: Option<&Frame>) -> Result<Frame, DecodeError> {
        let left = self.stream.read_u16();
        let top = self.stream.read_u16();

        let width = self.stream.read_u16();
        let height = self.stream.read_u16();

        let packed_fields = self.stream.read_byte();

        let local_color_table_flag = packed_fields & 0b10000000 != 0;
        let interlaced = packed_fields & 0b01000000 != 0;
        let local_color_table = local_color_table_flag.then(|| {
            let size = ColorTable::byte_len(packed_fields & 0b00000111);
            ColorTable::from_rgb_bytes(self.stream.read_bytes(size))
        });

        let lzw_code_size = self.stream.read_byte();
        let data_stream = self.stream.read_sub_blocks_as_vec();

        let pixel_count = width as usize * height as usize;
        if self.pixels.len() != pixel_count {
            self.pixels = vec![0; pixel_count];
        }
        let report = lzw::lzw_decode(&data_stream, lzw_code_size, &mut self.pixels);
        self.check_lzw(&report, pixel_count)?;

        let control = self.graphic_control;
        let image = ImageBlock {
            left,
            top,
            width,
            height,
            interlaced,
            transparency: control.transparency(),
            disposal_method: control.disposal_method,
        };
        debug!("processed image descriptor, got: {:?}", image);

        let fallback = ColorTable::default();
        let color_table = local_color_table
            .as_ref()
            .or(self.metadata.global_color_table.as_ref())
            .unwrap_or(&fallback);
        let bitmap = self.compositor.composite(&image, &self.pixels, color_table, previous);

        let delay = control.delay_ms();
        let frame = Frame {
            disposal_method: control.disposal_method,
            time: self.elapsed,
            delay,
            transparency_index: image.transparency,
            left,
            top,
            width,
            height,
            local_color_table,
            interlaced,
            image: bitmap,
        };
        self.elapsed += u64::from(delay);

        Ok(frame)
    }

    fn check_lzw(&self, report: &LzwReport, pixel_count: usize) -> Result<(), DecodeError> {
        if report.is_clean(pixel_count) {
            return Ok(());
        }

        let problem = if let Some(code) = report.invalid_code {
            format!("invalid lzw code {code}")
        } else if report.overflowed {
            format!("image data holds more than {pixel_count} pixels")
        } else {
            format!("image data ends after {} of {pixel_count} pixels", report.written)
        };

        if self.strict() {
            return Err(DecodeError::CorruptStream(problem));
        }
        warn!("{problem}, continuing");
        Ok(())
    }
}
