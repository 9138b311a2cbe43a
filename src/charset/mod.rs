//! Teletext character sets.
//!
//! Each page owns a [Charset] that turns raw Teletext bytes into UCS-2. The
//! default G0 set can be swapped for a Cyrillic or Greek family by packets
//! X/28 and M/29, and in the Latin family thirteen table positions get
//! patched by the selected National Option Sub-set.

pub mod tables;

/// Number of characters in a G0 or G2 set.
pub const CHAR_COUNT: usize = 96;

/// Marker for "no national option selected" in the X/28 and M/29 state.
const UNDEFINED: u8 = 0xFF;

/// Primary character set families selectable through packet X/28/0 or M/29/0
/// (`EN 300 706 V1.2.1`, table 32).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum G0Family {
    Latin,
    /// Serbian/Croatian flavour.
    Cyrillic1,
    /// Russian/Bulgarian flavour.
    Cyrillic2,
    /// Ukrainian flavour.
    Cyrillic3,
    Greek,
    /// Reserved, not implemented. Every character decodes to nothing.
    Arabic,
    /// Reserved, not implemented. Every character decodes to nothing.
    Hebrew,
}

/// Per-page character set state.
///
/// Owns its copy of the Latin G0 table so that a National Option can be
/// patched in without affecting other pages.
#[derive(Debug, Clone)]
pub struct Charset {
    g0_default: G0Family,
    g0_latin: [u16; CHAR_COUNT],
    /// Page-level National Option from packet X/28, or [UNDEFINED].
    g0_x28: u8,
    /// Magazine-level National Option from packet M/29, or [UNDEFINED].
    g0_m29: u8,
    /// National Option currently patched into the Latin table.
    current: u8,
}

impl Default for Charset {
    fn default() -> Charset {
        Charset {
            g0_default: G0Family::Latin,
            g0_latin: tables::G0_LATIN,
            g0_x28: UNDEFINED,
            g0_m29: UNDEFINED,
            current: 0x00,
        }
    }
}

impl Charset {
    /// Check parity and translate a Teletext character into UCS-2.
    ///
    /// A byte failing the odd parity check becomes a SPACE. Codes below
    /// `0x20` pass through, they are control codes and spacing attributes.
    pub fn teletext_to_ucs2(&self, c: u8) -> u16 {
        if tables::PARITY_8[c as usize] == 0 {
            // Unrecoverable parity error
            return 0x0020;
        }

        let r = (c & 0x7F) as u16;
        if r < 0x20 {
            return r;
        }

        let i = (r - 0x20) as usize;
        match self.g0_default {
            G0Family::Latin => self.g0_latin[i],
            G0Family::Cyrillic1 => tables::G0_CYRILLIC_1[i],
            G0Family::Cyrillic2 => tables::G0_CYRILLIC_2[i],
            G0Family::Cyrillic3 => tables::G0_CYRILLIC_3[i],
            G0Family::Greek => tables::G0_GREEK[i],
            G0Family::Arabic | G0Family::Hebrew => 0x0000,
        }
    }

    /// Translate a G2 character into UCS-2.
    ///
    /// Always reads the Latin supplementary set, whatever the default family.
    pub fn g2_to_ucs2(&self, c: u8) -> u16 {
        if (0x20..0x20 + CHAR_COUNT as u8).contains(&c) {
            tables::G2_LATIN[(c - 0x20) as usize]
        } else {
            0x0000
        }
    }

    /// Compose a G0 letter with one of the diacritical marks of packet X/26.
    ///
    /// Returns zero when no precomposed character exists for the combination.
    /// Anything that is not a letter translates like a plain G0 character.
    pub fn g2_accent_to_ucs2(&self, c: u8, accent: u8) -> u16 {
        if (accent as usize) < tables::G2_ACCENTS.len() {
            match c {
                b'A'..=b'Z' => return tables::G2_ACCENTS[accent as usize][(c - 65) as usize],
                b'a'..=b'z' => return tables::G2_ACCENTS[accent as usize][(c - 71) as usize],
                _ => {}
            }
        }
        self.teletext_to_ucs2(c)
    }

    //
    // -----

    /// Select the default G0 family from an X/28 or M/29 triplet
    /// (`EN 300 706 V1.2.1`, table 32). Unknown combinations mean Latin.
    pub fn set_g0_charset(&mut self, triplet: u32) {
        self.g0_default = if triplet & 0x3C00 != 0x1000 {
            G0Family::Latin
        } else {
            match triplet & 0x0380 {
                0x0000 => G0Family::Cyrillic1,
                0x0200 => G0Family::Cyrillic2,
                0x0280 => G0Family::Cyrillic3,
                _ => G0Family::Latin,
            }
        };
    }

    /// Latch the page-level National Option from packet X/28.
    pub fn set_x28(&mut self, charset: u8) {
        if self.g0_default == G0Family::Latin {
            self.g0_x28 = charset;
            self.remap_g0(charset);
        }
    }

    /// Store the magazine-level National Option from packet M/29.
    ///
    /// Only takes effect while no page-level option is latched.
    pub fn set_m29(&mut self, charset: u8) {
        if self.g0_default == G0Family::Latin {
            self.g0_m29 = charset;
            if self.g0_x28 == UNDEFINED {
                self.remap_g0(charset);
            }
        }
    }

    /// Drop the page-level option on a new page header.
    ///
    /// Falls back to the magazine-level option if one was stored, else to the
    /// charset control bits of the header itself.
    pub fn reset_x28(&mut self, fallback: u8) {
        if self.g0_default == G0Family::Latin {
            self.g0_x28 = UNDEFINED;
            self.remap_g0(if self.g0_m29 != UNDEFINED {
                self.g0_m29
            } else {
                fallback
            });
        }
    }

    /// Patch the National Option Sub-set for the given charset designation
    /// into the Latin G0 table.
    fn remap_g0(&mut self, charset: u8) {
        if charset == self.current || charset as usize >= tables::NATIONAL_SUBSET_MAP.len() {
            return;
        }

        let subset = tables::NATIONAL_SUBSET_MAP[charset as usize];
        if subset != 0xFF {
            for (j, &position) in tables::NATIONAL_SUBSET_POSITIONS.iter().enumerate() {
                self.g0_latin[position as usize] = tables::NATIONAL_SUBSETS[subset as usize][j];
            }
            self.current = charset;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parity_failure_becomes_space() {
        let charset = Charset::default();
        // 0x41 has an even number of ones, its parity bit should have been set
        assert_eq!(charset.teletext_to_ucs2(0x41), 0x0020);
        assert_eq!(charset.teletext_to_ucs2(0xC1), 0x0041);
    }

    #[test]
    fn control_codes_pass_through() {
        let charset = Charset::default();
        assert_eq!(charset.teletext_to_ucs2(0x0B), 0x000B);
        assert_eq!(charset.teletext_to_ucs2(0x8A), 0x000A);
        assert_eq!(charset.teletext_to_ucs2(0x02), 0x0002);
    }

    #[test]
    fn default_latin_set_carries_english_options() {
        let charset = Charset::default();
        // 0x23 sits on a patched position, England gets a pound sign there
        assert_eq!(charset.teletext_to_ucs2(0x23), 0x00A3);
        assert_eq!(charset.teletext_to_ucs2(0xC1), 0x0041);
        assert_eq!(charset.teletext_to_ucs2(0x7F), 0x007F);
    }

    #[test]
    fn x28_patches_all_national_positions() {
        let mut charset = Charset::default();
        // Designation 3 maps to the Czech/Slovak subset
        charset.set_x28(3);

        assert_eq!(charset.teletext_to_ucs2(0x23), 0x0023);
        // 0xFB is 0x7B with its parity bit set, sitting on patched position 0x5b
        assert_eq!(charset.teletext_to_ucs2(0xFB), 0x00E1);

        for (j, &position) in tables::NATIONAL_SUBSET_POSITIONS.iter().enumerate() {
            assert_eq!(charset.g0_latin[position as usize], tables::NATIONAL_SUBSETS[3][j]);
        }
    }

    #[test]
    fn unassigned_designation_changes_nothing() {
        let mut charset = Charset::default();
        let before = charset.g0_latin;
        // Designation 13 has no subset in table 32
        charset.set_x28(13);
        assert_eq!(charset.g0_latin, before);
        // Out of range designations neither
        charset.set_x28(56);
        assert_eq!(charset.g0_latin, before);
    }

    #[test]
    fn reset_x28_equals_fresh_remap() {
        let mut charset = Charset::default();
        charset.set_x28(3);
        charset.reset_x28(1);

        let mut fresh = Charset::default();
        fresh.set_x28(1);
        assert_eq!(charset.g0_latin, fresh.g0_latin);
    }

    #[test]
    fn m29_only_applies_without_page_override() {
        let mut charset = Charset::default();
        charset.set_x28(3);
        charset.set_m29(1);
        // X/28 still wins
        assert_eq!(charset.teletext_to_ucs2(0xFB), 0x00E1);

        // Once the page override goes away, the magazine option takes over
        charset.reset_x28(0);
        let mut fresh = Charset::default();
        fresh.set_x28(1);
        assert_eq!(charset.g0_latin, fresh.g0_latin);
    }

    #[test]
    fn g0_family_selection_from_triplet() {
        let mut charset = Charset::default();

        // Bits 10 to 13 at 0b0100 select the non-Latin families
        charset.set_g0_charset(0x1000);
        assert_eq!(charset.g0_default, G0Family::Cyrillic1);
        assert_eq!(charset.teletext_to_ucs2(0xC1), 0x0410);

        charset.set_g0_charset(0x1200);
        assert_eq!(charset.g0_default, G0Family::Cyrillic2);
        charset.set_g0_charset(0x1280);
        assert_eq!(charset.g0_default, G0Family::Cyrillic3);

        // Anything else falls back to Latin
        charset.set_g0_charset(0x1100);
        assert_eq!(charset.g0_default, G0Family::Latin);
        charset.set_g0_charset(0x0000);
        assert_eq!(charset.g0_default, G0Family::Latin);
    }

    #[test]
    fn non_latin_family_ignores_national_options() {
        let mut charset = Charset::default();
        charset.set_g0_charset(0x1000);
        let before = charset.g0_latin;
        charset.set_x28(3);
        charset.set_m29(3);
        charset.reset_x28(3);
        assert_eq!(charset.g0_latin, before);
    }

    #[test]
    fn g2_reads_the_latin_supplementary_set() {
        let charset = Charset::default();
        assert_eq!(charset.g2_to_ucs2(0x20), 0x0020);
        assert_eq!(charset.g2_to_ucs2(0x21), 0x00A1);
        assert_eq!(charset.g2_to_ucs2(0x7F), 0x0020);
        assert_eq!(charset.g2_to_ucs2(0x1F), 0x0000);
        assert_eq!(charset.g2_to_ucs2(0x80), 0x0000);
    }

    #[test]
    fn accents_compose_letters() {
        let charset = Charset::default();
        // e + circumflex
        assert_eq!(charset.g2_accent_to_ucs2(b'e', 2), 0x00EA);
        // A + grave
        assert_eq!(charset.g2_accent_to_ucs2(b'A', 0), 0x00C0);
        // z + caron
        assert_eq!(charset.g2_accent_to_ucs2(b'z', 14), 0x017E);
        // Undefined accent rows compose to nothing
        assert_eq!(charset.g2_accent_to_ucs2(b'A', 8), 0x0000);
        assert_eq!(charset.g2_accent_to_ucs2(b'A', 11), 0x0000);
    }

    #[test]
    fn accent_on_non_letter_translates_plainly() {
        let charset = Charset::default();
        // 0x31 has odd parity and is no letter, comes back as the digit itself
        assert_eq!(charset.g2_accent_to_ucs2(0x31, 0), 0x0031);
    }
}
