// Copyright (c) 2020-present, UMD Database Group.
//
// This program is free software: you can use, redistribute, and/or modify
// it under the terms of the GNU Affero General Public License, version 3
// or later ("AGPL"), as published by the Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.

//! A simple rainbow-colored printer for the CLI banners.

use std::f64::consts::PI;

/// Prints the text in the rainbow fashion, one color step per character.
pub fn rainbow_println<T: AsRef<str>>(text: T) {
    for line in text.as_ref().lines() {
        let colored = line
            .char_indices()
            .map(|(i, c)| {
                if c.is_whitespace() {
                    c.to_string()
                } else {
                    let (r, g, b) = rgb(i as f64);
                    format!("\x1b[38;2;{};{};{}m{}\x1b[0m", r, g, b, c)
                }
            })
            .collect::<String>();
        println!("{}", colored);
    }
}

/// Prints `title` centered in a framed banner.
pub fn rainbow_banner(title: &str) {
    let rule = "=".repeat(60);
    rainbow_println(&rule);
    rainbow_println(format!("{:^60}", title));
    rainbow_println(&rule);
}

/// Generates RGB for rainbow print.
fn rgb(i: f64) -> (u8, u8, u8) {
    const FREQUENCY: f64 = 0.1;
    const SPREAD: f64 = 3.0;
    let j = FREQUENCY * i / SPREAD;
    let channel = |phase: f64| ((j + phase).sin() * 127.0 + 128.0) as u8;
    (channel(0.0), channel(2.0 * PI / 3.0), channel(4.0 * PI / 3.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rainbow_print() {
        rainbow_println(include_str!("./emrflow"));
        rainbow_banner("Create an EMR cluster");
    }

    #[test]
    fn colors_stay_in_range() {
        assert_eq!((128, 237, 18), rgb(0.0));
        for i in 0..500 {
            let (r, g, b) = rgb(i as f64);
            assert!(r >= 1 && g >= 1 && b >= 1);
        }
    }
}
