//! Teletext packet interpretation and page rendering.
//!
//! The [TeletextDecoder] keeps one [PidContext] per PID, reconstructs pages
//! from the packets found in PES payloads and renders a page into a
//! [TextSample] once its transmission cycle comes around again (or on an
//! explicit flush).

use std::collections::HashMap;

use log::{debug, info, trace};

use crate::{
    hamming::{unham_8_4, unham_24_18},
    page::{COLUMN_COUNT, ROW_COUNT, TeletextPage, magazine_of, page_bcd_to_binary, page_of},
    pes::{self, DataUnitId, PACKET_SIZE},
    sample::TextSample,
    utils::ucs2_to_utf8,
};

/// Foreground colours of the spacing attributes 0 to 7.
const COLOURS: [&str; 8] = [
    "#000000", "#ff0000", "#00ff00", "#ffff00", "#0000ff", "#ff00ff", "#00ffff", "#ffffff",
];

/// Teletext transmission mode, from control bit C11 of the page header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransMode {
    /// Magazines interleave freely, a page is terminated by the next header
    /// with a different page number in the same magazine.
    Parallel,
    /// Pages of all magazines are sent one after the other, any header with a
    /// different page number terminates the previous page.
    Serial,
}

/// Decoding state for one PID of the transport stream.
#[derive(Debug)]
pub struct PidContext {
    /// Whether packets should currently be written into the page buffer.
    receiving_data: bool,
    trans_mode: TransMode,
    /// Page number currently being filled.
    current_page: u16,
    /// Working page buffers, created on first reference.
    pages: HashMap<u16, TeletextPage>,
    /// Most recent PTS seen on this PID, used as the hide time when flushing.
    last_pts: i64,
}

impl Default for PidContext {
    fn default() -> PidContext {
        PidContext {
            receiving_data: false,
            trans_mode: TransMode::Serial,
            current_page: 0,
            pages: HashMap::new(),
            last_pts: 0,
        }
    }
}

//
// -----

/// Stateful decoder turning Teletext PES payloads into timed text samples.
///
/// Completed samples are handed to the sink closure before
/// [process_pes](TeletextDecoder::process_pes) returns.
pub struct TeletextDecoder<F: FnMut(TextSample)> {
    contexts: HashMap<u32, PidContext>,
    add_colour: bool,
    sink: F,
    payloads: u64,
    packets: u64,
    emitted: u64,
}

impl<F: FnMut(TextSample)> TeletextDecoder<F> {
    /// Create a decoder producing plain text samples.
    pub fn new(sink: F) -> TeletextDecoder<F> {
        Self::build(false, sink)
    }

    /// Create a decoder producing samples with HTML-style colour markup.
    pub fn with_colour(sink: F) -> TeletextDecoder<F> {
        Self::build(true, sink)
    }

    fn build(add_colour: bool, sink: F) -> TeletextDecoder<F> {
        TeletextDecoder {
            contexts: HashMap::new(),
            add_colour,
            sink,
            payloads: 0,
            packets: 0,
            emitted: 0,
        }
    }

    /// Consume one PES payload from a Teletext PID.
    ///
    /// Payloads that do not carry EBU Teletext data are dropped, truncated
    /// data units end the payload early. Neither is an error to the caller.
    pub fn process_pes(&mut self, pid: u32, pts: i64, payload: &[u8]) {
        let units = match pes::data_units(payload) {
            Ok(units) => units,
            Err(e) => {
                debug!("dropping payload on PID {pid}: {e}");
                return;
            }
        };
        self.payloads += 1;

        let add_colour = self.add_colour;
        let mut samples = Vec::new();
        let pc = self.contexts.entry(pid).or_default();
        for (unit_id, unit) in units {
            if unit.len() != PACKET_SIZE
                || !matches!(unit_id, DataUnitId::NonSubtitle | DataUnitId::Subtitle)
            {
                continue;
            }

            // Teletext bytes arrive least significant bit first, swap them
            // around once here (EN 300 706, section 7.1)
            let mut pkt = [0u8; PACKET_SIZE];
            for (out, &byte) in pkt.iter_mut().zip(unit) {
                *out = pes::reverse8(byte);
            }

            self.packets += 1;
            process_packet(pc, unit_id, &pkt, pts, add_colour, &mut samples);
        }

        self.emit(samples);
    }

    /// Render and emit every page still holding text, using the last seen PTS
    /// as the hide time.
    pub fn flush(&mut self) {
        let add_colour = self.add_colour;
        let mut samples = Vec::new();
        for (pid, pc) in &mut self.contexts {
            for (&page_number, page) in &mut pc.pages {
                if page.tainted {
                    // This is the end of the stream, nothing else will show
                    page.hide_timestamp = pc.last_pts;
                    debug!(
                        "flushing page {} on PID {pid}",
                        page_bcd_to_binary(page_number)
                    );
                    process_page(page, add_colour, &mut samples);
                    page.reset(pc.last_pts);
                }
            }
        }
        self.emit(samples);
    }

    /// Drop all decoding state of a PID.
    pub fn reset(&mut self, pid: u32) {
        self.contexts.remove(&pid);
    }

    fn emit(&mut self, samples: Vec<TextSample>) {
        self.emitted += samples.len() as u64;
        for sample in samples {
            (self.sink)(sample);
        }
    }
}

impl<F: FnMut(TextSample)> Drop for TeletextDecoder<F> {
    fn drop(&mut self) {
        info!(
            "Teletext decoder: {} payloads, {} packets, {} samples",
            self.payloads, self.packets, self.emitted
        );
    }
}

//
// -----

/// Interpret one 44 byte Teletext packet against its PID context.
fn process_packet(
    pc: &mut PidContext,
    unit_id: DataUnitId,
    pkt: &[u8; PACKET_SIZE],
    pts: i64,
    add_colour: bool,
    samples: &mut Vec<TextSample>,
) {
    pc.last_pts = pts;

    // Packet layout: clock run-in, framing code, 2 address bytes, 40 data
    // bytes (EN 300 706, section 7.1). The address carries the magazine
    // number and the row, magazine 8 travels as zero.
    let address = (unham_8_4(pkt[3]) << 4) | unham_8_4(pkt[2]);
    let mut m = address & 0b0000_0111;
    if m == 0 {
        m = 8;
    }
    let y = (address >> 3) & 0b0001_1111;
    let data = &pkt[4..];
    let designation_code = if y > 25 { unham_8_4(data[0]) } else { 0x00 };

    if y == 0 {
        // Page header: page number, charset control bits C12-C14 and the
        // transmission mode flag C11 (EN 300 706, section 9.3.1.3)
        let page_number = ((m as u16) << 8)
            | ((unham_8_4(data[1]) as u16) << 4)
            | unham_8_4(data[0]) as u16;
        let charset = (unham_8_4(data[7]) & 0b0000_1110) >> 1;

        pc.trans_mode = if unham_8_4(data[7]) & 0b0000_0001 == 1 {
            TransMode::Serial
        } else {
            TransMode::Parallel
        };
        trace!("header for page {page_number:#05x}, {:?} transmission", pc.trans_mode);

        // Only subtitle pages are of interest. In parallel mode the other
        // magazines keep going, so their headers must not disturb our state.
        if pc.trans_mode == TransMode::Parallel && unit_id != DataUnitId::Subtitle {
            return;
        }

        // Page termination rules, EN 300 706 sections 7.2.1 and 9.3.1.3
        if pc.receiving_data {
            let terminated = match pc.trans_mode {
                TransMode::Serial => page_of(page_number) != page_of(pc.current_page),
                TransMode::Parallel => {
                    page_of(page_number) != page_of(pc.current_page)
                        && m == magazine_of(pc.current_page)
                }
            };
            if terminated {
                pc.receiving_data = false;
            }
        }

        // A new transmission of this page starts here. Whatever its buffer
        // still holds from the previous cycle is complete, render it now.
        let page = pc.pages.entry(page_number).or_default();
        if page.tainted {
            // Back off by one frame at 25 fps so the old subtitle does not
            // linger over the video frame introducing the new one
            page.hide_timestamp = pts - 40;
            trace!("page {page_number:#05x} comes around, rendering previous cycle");
            process_page(page, add_colour, samples);
        }

        pc.current_page = page_number;
        page.reset(pts);
        page.charset.reset_x28(charset);
        pc.receiving_data = true;
    } else if m == magazine_of(pc.current_page) && (1..=23).contains(&y) && pc.receiving_data {
        // Plain text row. X/26 packets are sent before X/1 to X/25 (EN 300
        // 706, annex B.2.2), cells they already filled in take precedence
        // over the original G0 character.
        trace!("text row {y} for page {:#05x}", pc.current_page);
        let page = pc.pages.entry(pc.current_page).or_default();
        for (i, &byte) in data.iter().take(COLUMN_COUNT).enumerate() {
            if page.text[y as usize][i] == 0x0000 {
                page.text[y as usize][i] = page.charset.teletext_to_ucs2(byte);
            }
        }
        page.tainted = true;
    } else if m == magazine_of(pc.current_page) && y == 26 && pc.receiving_data {
        // X/26: thirteen Hamming 24/18 triplets overlaying characters onto
        // the Level 1 page (EN 300 706, section 12.3.2)
        trace!("X/26 overlay for page {:#05x}", pc.current_page);
        let mut row = 0usize;

        let page = pc.pages.entry(pc.current_page).or_default();
        for j in 0..13 {
            let i = 1 + 3 * j;
            let triplet = unham_24_18(
                ((data[i + 2] as u32) << 16) | ((data[i + 1] as u32) << 8) | data[i] as u32,
            );
            if triplet == 0xFFFF_FFFF {
                // Uncorrectable, skip the triplet
                continue;
            }

            let tdata = ((triplet & 0x3F800) >> 11) as u8;
            let tmode = ((triplet & 0x007C0) >> 6) as u8;
            let taddr = (triplet & 0x0003F) as u8;
            let row_address_group = (40..=63).contains(&taddr);

            // Interpretation of the modes follows EN 300 706, table 27
            if tmode == 0x04 && row_address_group {
                // Set active position, row zero addresses the bottom row
                row = (taddr - 40) as usize;
                if row == 0 {
                    row = 24;
                }
            }
            if (0x11..=0x1F).contains(&tmode) && row_address_group {
                // Termination marker
                break;
            }
            if tmode == 0x0F && !row_address_group {
                // Character from the G2 set
                let col = taddr as usize;
                if tdata > 31 {
                    page.text[row][col] = page.charset.g2_to_ucs2(tdata);
                }
            }
            if (0x11..=0x1F).contains(&tmode) && !row_address_group {
                // G0 character with a diacritical mark
                let col = taddr as usize;
                page.text[row][col] = page.charset.g2_accent_to_ucs2(tdata, tmode - 0x11);
            }
        }
    } else if m == magazine_of(pc.current_page) && y == 28 && pc.receiving_data {
        // TODO: when both X/28/0 and X/28/4 are present, X/28/4 should take
        // precedence for the colour map entry coding (EN 300 706, 9.4.7)
        trace!("X/28/{designation_code} for page {:#05x}", pc.current_page);
        if designation_code == 0 || designation_code == 4 {
            // X/28/0 format 1 carries the G0 designation in its first triplet
            let triplet0 = unham_24_18(
                ((data[3] as u32) << 16) | ((data[2] as u32) << 8) | data[1] as u32,
            );
            if triplet0 & 0x0F == 0x00 {
                let page = pc.pages.entry(pc.current_page).or_default();
                page.charset.set_g0_charset(triplet0);
                page.charset.set_x28(((triplet0 & 0x3F80) >> 7) as u8);
            }
        }
    } else if m == magazine_of(pc.current_page) && y == 29 {
        // M/29/0 and M/29/4, the magazine-wide counterpart of X/28
        trace!("M/29/{designation_code} for magazine {m}");
        if designation_code == 0 || designation_code == 4 {
            let triplet0 = unham_24_18(
                ((data[3] as u32) << 16) | ((data[2] as u32) << 8) | data[1] as u32,
            );
            if triplet0 & 0xFF == 0x00 {
                let page = pc.pages.entry(pc.current_page).or_default();
                page.charset.set_g0_charset(triplet0);
                page.charset.set_m29(((triplet0 & 0x3F80) >> 7) as u8);
            }
        }
    } else if m == 8 && y == 30 {
        // Broadcast service data (EN 300 706, section 9.8): programme
        // identification and time stamps, nothing we need
    }
}

//
// -----

/// Render a completed page into a text sample.
fn process_page(page: &mut TeletextPage, add_colour: bool, samples: &mut Vec<TextSample>) {
    if page.is_empty() {
        return;
    }

    page.frame_count += 1;
    if page.show_timestamp > page.hide_timestamp {
        page.hide_timestamp = page.show_timestamp;
    }

    let mut body = String::new();

    for row in 1..ROW_COUNT {
        // The rightmost start-of-box mark anchors the line
        let Some(mut col_start) = (0..COLUMN_COUNT).rev().find(|&col| page.text[row][col] == 0x0B)
        else {
            continue;
        };

        let mut col_stop = COLUMN_COUNT;
        for col in col_start + 1..COLUMN_COUNT {
            if page.text[row][col] > 0x20 {
                if col_stop == COLUMN_COUNT {
                    col_start = col;
                }
                col_stop = col;
            }
            if page.text[row][col] == 0x0A {
                break;
            }
        }
        if col_stop == COLUMN_COUNT {
            // Nothing printable inside the box
            continue;
        }

        // Alpha White is the start-of-row default (EN 300 706, section 12.2),
        // attributes before the box only move the starting colour
        let mut foreground: u16 = 0x07;
        let mut font_tag_open = false;
        let mut line: Vec<u16> = Vec::with_capacity(COLUMN_COUNT);

        for col in 0..=col_stop {
            let mut v = page.text[row][col];

            if col < col_start && v <= 0x07 {
                foreground = v;
            }

            if col == col_start && foreground != 0x07 && add_colour {
                open_font_tag(&mut line, foreground);
                font_tag_open = true;
            }

            if col >= col_start {
                if v <= 0x07 {
                    // A cell occupied by a spacing attribute displays as SPACE
                    if add_colour {
                        if font_tag_open {
                            line.extend("</font> ".encode_utf16());
                            font_tag_open = false;
                        }
                        if v > 0x00 && v < 0x07 {
                            open_font_tag(&mut line, v);
                            font_tag_open = true;
                        }
                    } else {
                        v = 0x20;
                    }
                }

                if v >= 0x20 && add_colour {
                    // Keep the markup well-formed
                    let entity = match v {
                        0x3C => Some("&lt;"),
                        0x3E => Some("&gt;"),
                        0x26 => Some("&amp;"),
                        _ => None,
                    };
                    if let Some(entity) = entity {
                        line.extend(entity.encode_utf16());
                        v = 0x0000;
                    }
                }

                if v >= 0x20 {
                    line.push(v);
                }
            }
        }

        if add_colour && font_tag_open {
            line.extend("</font>".encode_utf16());
        }

        let line = ucs2_to_utf8(&line);
        if !line.is_empty() {
            if !body.is_empty() {
                body.push(' ');
            }
            body.push_str(&line);
        }
    }

    samples.push(TextSample {
        id: page.frame_count.to_string(),
        start_ms: page.show_timestamp,
        end_ms: page.hide_timestamp,
        body,
    });
}

fn open_font_tag(line: &mut Vec<u16>, colour: u16) {
    line.extend("<font color=\"".encode_utf16());
    line.extend(COLOURS[colour as usize].encode_utf16());
    line.extend("\">".encode_utf16());
}
